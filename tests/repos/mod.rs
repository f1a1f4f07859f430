#![allow(dead_code)]

pub mod test_repo;

/// File contents from a list of lines, each newline-terminated
macro_rules! lines {
    ($($line:expr),* $(,)?) => {{
        let mut contents = String::new();
        $(
            contents.push_str($line);
            contents.push('\n');
        )*
        contents
    }};
}
