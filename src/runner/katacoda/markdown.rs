//! Markdown fragments for tutorial steps.
//!
//! Tutorial paths are POSIX paths inside the scenario machine, independent
//! of the host platform, so they are handled as strings.

/// Home directory inside the scenario machine.
pub const SCENARIO_ROOT: &str = "/root";

/// Join a relative POSIX path onto `base`, dropping `.` segments and
/// trailing slashes.
pub fn posix_join(base: &str, relative: &str) -> String {
    let relative = relative.replace('\\', "/");
    let mut parts: Vec<&str> = if relative.starts_with('/') {
        Vec::new()
    } else {
        base.split('/').filter(|p| !p.is_empty()).collect()
    };
    for part in relative.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Argument for `cd` that moves from `from` to `to`.
pub fn cd_param(from: &str, to: &str) -> String {
    let from: Vec<&str> = from.split('/').filter(|p| !p.is_empty()).collect();
    let to: Vec<&str> = to.split('/').filter(|p| !p.is_empty()).collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to[common..]);
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// An executable code span for terminal `terminal`.
pub fn execute(command: &str, terminal: u32) -> String {
    format!("`{}`{{{{execute T{}}}}}\n\n", command, terminal)
}

/// Instruction to stop whatever runs in `terminal`.
pub fn interrupt(terminal: u32) -> String {
    format!(
        "Stop the running process first.\n\n`echo \"stopping\"`{{{{execute interrupt T{}}}}}\n\n",
        terminal
    )
}

/// Change directory in `terminal`.
pub fn cd(dir: &str, terminal: u32) -> String {
    let opening = if terminal > 1 {
        format!("Open a new terminal (T{}) and change to the directory.\n\n", terminal)
    } else {
        "Change to the directory.\n\n".to_string()
    };
    format!("{}{}", opening, execute(&format!("cd {}", dir), terminal))
}

/// An editor block that writes or inserts `content` into `file`.
pub fn file_block(file: &str, content: &str, marker: Option<&str>) -> String {
    let target = match marker {
        Some(marker) => format!("data-target=\"insert\" data-marker=\"{}\"", marker),
        None => "data-target=\"replace\"".to_string(),
    };
    format!(
        "<pre class=\"file\" data-filename=\"{}\" {}>\n{}\n</pre>\n\n",
        file, target, content
    )
}

/// Surround `body` with the step's leading and trailing prose.
pub fn with_text(text: &str, body: &str, text_after: &str) -> String {
    let mut out = String::new();
    if !text.trim().is_empty() {
        out.push_str(text.trim_end());
        out.push_str("\n\n");
    }
    out.push_str(body);
    if !text_after.trim().is_empty() {
        out.push_str(text_after.trim_end());
        out.push_str("\n\n");
    }
    out
}
