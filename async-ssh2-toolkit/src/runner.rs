use log::debug;
use tokio::io::AsyncWriteExt as _;

use crate::{
    context::{ExecContext, RemoteProcess},
    error::Error,
};

/// Starts an interactive shell on `ctx`, types `commands` into it one line
/// each, then waits for the shell to exit.
///
/// The shell only exits on its own once it reads `exit` or the remote side
/// hangs up, so callers usually end `commands` with `exit`.
pub async fn run_commands<P, I>(ctx: &mut ExecContext<P>, commands: I) -> Result<(), Error>
where
    P: RemoteProcess,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut stdin = ctx.stdin_pipe()?;
    ctx.shell().await?;

    for command in commands {
        let line = format!("{}\n", command.as_ref());
        stdin.write_all(line.as_bytes()).await?;
        debug!("sent `{}`", command.as_ref());
    }

    let ret = ctx.wait().await;
    drop(stdin);
    ret
}
