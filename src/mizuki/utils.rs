use std::fs::File;
use std::io::{stdin, stdout, Read, Write};
use std::path::PathBuf;

use crossterm::{
    execute,
    style::{Attribute, SetAttribute},
    tty::IsTty,
};

use crate::errors::{Error, ErrorKind, Result};
use crate::specific_fail_str;

pub fn istty() -> bool {
    stdout().is_tty()
}

/// print `bold` in bold (when on a terminal) followed by `plain`
pub fn pretty_line(bold: &str, plain: &str, tty: bool) -> Result<()> {
    let mut out = stdout();
    if tty {
        execute!(out, SetAttribute(Attribute::Bold))?;
    }
    print!("{}", bold);
    if tty {
        execute!(out, SetAttribute(Attribute::Reset))?;
    }
    print!("{}", plain);
    Ok(())
}

/// pad or cut `value` to `width` characters
pub fn format_field(value: &str, width: usize, truncate: bool) -> String {
    let len = value.chars().count();
    if len > width && width > 3 && truncate {
        let cut: String = value.chars().take(width - 3).collect();
        format!("{}...", cut)
    } else if len < width {
        format!("{}{}", value, " ".repeat(width - len))
    } else {
        value.to_string()
    }
}

pub fn get_yn_input(message: &str) -> Result<bool> {
    print!("{}", message);
    stdout().flush()?;

    let stdin = stdin();
    let yes = ["y", "Y", "yes", "YES", "Yes"];
    let no = ["n", "N", "no", "NO", "No"];

    loop {
        print!("[y/n]# ");
        stdout().flush()?;
        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            return Ok(false);
        }
        let input = input.trim();
        if yes.contains(&input) {
            return Ok(true);
        } else if no.contains(&input) {
            return Ok(false);
        };
        println!("invalid input.");
    }
}

pub fn get_password() -> Result<String> {
    print!("Password: ");
    stdout().flush()?;
    rpassword::read_password().map_err(|e| Error {
        kind: ErrorKind::Generic,
        desc: format!("Failed to read password: {}", e),
        detail: None,
    })
}

/// folder holding the preferences file: `--store` if given, otherwise
/// `~/.mizuki`, or the path written inside `~/.mizuki` when that is a file
pub fn find_store_folder(store: &Option<String>) -> Result<PathBuf> {
    if let Some(s) = store {
        return Ok(PathBuf::from(s));
    }
    match dirs::home_dir() {
        Some(p) => {
            let default_path = p.join(".mizuki");
            if default_path.is_file() {
                let mut contents = String::new();
                File::open(&default_path)?.read_to_string(&mut contents)?;
                let trimmed = contents.trim();
                if trimmed.is_empty() {
                    return specific_fail_str!("~/.mizuki is a file but is empty. It should contain a path to the store directory.");
                }
                Ok(PathBuf::from(trimmed))
            } else {
                Ok(default_path)
            }
        }
        None => specific_fail_str!("failed to find your home directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_field_pads_and_truncates_by_chars() {
        assert_eq!(format_field("ab", 4, false), "ab  ");
        assert_eq!(format_field("abcdefgh", 6, true), "abc...");
        assert_eq!(format_field("abcdefgh", 6, false), "abcdefgh");
        assert_eq!(format_field("基础设置", 6, false), "基础设置  ");
    }

    #[test]
    fn explicit_store_folder_wins() {
        let folder = find_store_folder(&Some("/tmp/somewhere".to_string())).unwrap();
        assert_eq!(folder, PathBuf::from("/tmp/somewhere"));
    }
}
