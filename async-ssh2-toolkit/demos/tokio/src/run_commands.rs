/*
cargo run -p async-ssh2-toolkit-demo-tokio --bin run_commands -- 127.0.0.1:22 root 123456
*/

use std::{env, error};

use async_ssh2_toolkit::{
    run_commands, AcceptAnyHostKey, CaptureBuffer, Client, ClientConfig, RemoteEndpoint,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn error::Error>> {
    env_logger::init();

    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| env::var("ADDR").unwrap_or_else(|_| "127.0.0.1:22".to_owned()));
    let username = env::args()
        .nth(2)
        .unwrap_or_else(|| env::var("USERNAME").unwrap_or_else(|_| "root".to_owned()));
    let password = env::args()
        .nth(3)
        .unwrap_or_else(|| env::var("PASSWORD").unwrap_or_else(|_| "123456".to_owned()));

    let (host, port) = addr.rsplit_once(':').ok_or("ADDR must look like host:port")?;
    let endpoint = RemoteEndpoint::new(host, port.parse()?);

    let client = Client::connect(
        &endpoint,
        ClientConfig::password(username, password, AcceptAnyHostKey),
    )
    .await?;

    let stdout = CaptureBuffer::new();
    let mut ctx = client.context().await?;
    ctx.set_stdout(stdout.clone())?;
    run_commands(&mut ctx, ["uname -a", "id", "exit"]).await?;

    print!("{}", stdout.to_string_lossy());

    client.disconnect().await?;

    Ok(())
}
