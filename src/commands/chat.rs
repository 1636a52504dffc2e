use std::io::{BufRead, Write};

use crate::dispatch::Dispatcher;
use crate::error::Result;

/// Feed chat command lines from `input` through the dispatcher for `user`,
/// writing one reply per non-blank line to `out`.
pub fn run<R: BufRead, W: Write>(
    dispatcher: &Dispatcher,
    user: &str,
    input: R,
    mut out: W,
) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = dispatcher.handle(user, &line);
        writeln!(out, "{}", reply.text)?;
        out.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::files::TaskStore;
    use crate::store::repo::TaskRepository;
    use tempfile::tempdir;

    #[test]
    fn replies_once_per_command_line() {
        let dir = tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("user_data.json"));
        let dispatcher = Dispatcher::new(TaskRepository::new(store));

        let input = "/add Buy milk\n\n/add Call mom\n/done 1\n/tasks\n";
        let mut out = Vec::new();
        run(&dispatcher, "7", input.as_bytes(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Task added! You now have 1 task(s).\n\
             Task added! You now have 2 task(s).\n\
             Great job! Task 1 marked as done!\n\
             Your tasks:\n\n1. [x] Buy milk\n2. [ ] Call mom\n"
        );
    }
}
