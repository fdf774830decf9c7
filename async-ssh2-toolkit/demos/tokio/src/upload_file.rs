/*
cargo run -p async-ssh2-toolkit-demo-tokio --bin upload_file -- 127.0.0.1:22 root id_rsa a.txt /tmp
*/

use std::{env, error, path::PathBuf};

use async_ssh2_toolkit::{
    AcceptAnyHostKey, Client, ClientConfig, RemoteEndpoint, ScpTarget, ScpUploader,
};
use log::info;
use tokio::fs::File;

#[tokio::main]
async fn main() -> Result<(), Box<dyn error::Error>> {
    env_logger::init();

    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| env::var("ADDR").unwrap_or_else(|_| "127.0.0.1:22".to_owned()));
    let username = env::args()
        .nth(2)
        .unwrap_or_else(|| env::var("USERNAME").unwrap_or_else(|_| "root".to_owned()));
    let privatekey = env::args()
        .nth(3)
        .map(PathBuf::from)
        .or_else(|| env::var("PRIVATEKEY").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("id_rsa"));
    let local_path = env::args()
        .nth(4)
        .map(PathBuf::from)
        .ok_or("missing local file argument")?;
    let remote_dir = env::args().nth(5).unwrap_or_else(|| "/tmp".to_owned());

    let (host, port) = addr.rsplit_once(':').ok_or("ADDR must look like host:port")?;
    let endpoint = RemoteEndpoint::new(host, port.parse()?);

    let file_name = local_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or("local file needs a utf-8 file name")?
        .to_owned();
    let file = File::open(&local_path).await?;
    let length = file.metadata().await?.len();

    let client = Client::connect(
        &endpoint,
        ClientConfig::private_key_file(username, privatekey, AcceptAnyHostKey),
    )
    .await?;

    let target = ScpTarget::new(&remote_dir, &file_name, "0644")?;
    let mut ctx = client.context().await?;
    let written = ScpUploader::default()
        .upload(&mut ctx, file, length, &target)
        .await?;
    info!("uploaded {written} bytes to {remote_dir}/{file_name}");

    client.disconnect().await?;

    println!("done");

    Ok(())
}
