//! `cd` and the interactive shell over the command table.

use crate::Session;
use anyhow::{bail, Result};
use e2fs::navigate::{cur_inode, cur_path, name_or_inode, set_cur_inode, ROOT_INODE};
use e2fs::prompt::prompt;

/// `cd [name-or-id]`: update the persisted working inode; no argument
/// returns to the root directory.
pub fn cd(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let id = match args {
        [] => ROOT_INODE,
        [token] => name_or_inode(sess.sb, token, cur_inode(&sess.state))?,
        _ => bail!("usage: cd [name-or-id]"),
    };
    set_cur_inode(&sess.state, id)?;
    Ok(())
}

/// `shell`: a REPL over the same dispatch table as the one-shot commands.
/// Each command failure is reported and the loop continues.
pub fn shell(sess: &Session<'_>) -> Result<()> {
    loop {
        let cwd = cur_inode(&sess.state);
        let path = cur_path(sess.sb, cwd);
        let Some(line) = prompt(format!("{cwd:#x} {path} $ ")) else {
            break;
        };
        let words: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
        let Some((cmd, rest)) = words.split_first() else {
            continue;
        };
        if cmd == "exit" || cmd == "quit" {
            break;
        }
        if let Err(e) = crate::dispatch(sess, cmd, rest) {
            eprintln!("e2probe: {e:#}");
        }
    }
    println!("Goodbye");
    Ok(())
}
