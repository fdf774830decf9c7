use std::error;

use async_ssh2_toolkit::{
    upload_str, AcceptAnyHostKey, CaptureBuffer, Client, ClientConfig, ScpTarget, ScpUploader,
};
use rand::{distributions::Alphanumeric, thread_rng, Rng as _};
use uuid::Uuid;

use super::helpers::{get_endpoint, get_privatekey_path, get_username, init_logger};

//
const FILE_SIZE: usize = 1024 * 512;

async fn connect() -> Result<Client, Box<dyn error::Error>> {
    let config =
        ClientConfig::private_key_file(get_username(), get_privatekey_path(), AcceptAnyHostKey);
    Ok(Client::connect(&get_endpoint(), config).await?)
}

async fn read_remote(client: &Client, path: &str) -> Result<String, Box<dyn error::Error>> {
    let stdout = CaptureBuffer::new();
    let mut ctx = client.context().await?;
    ctx.set_stdout(stdout.clone())?;
    ctx.run(&format!("cat {path}")).await?;
    Ok(stdout.to_string_lossy())
}

//
#[tokio::test]
async fn upload_str_creates_the_file() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let client = connect().await?;
    let name = format!("scp_{}", Uuid::new_v4());

    let mut ctx = client.context().await?;
    let written = upload_str(&mut ctx, "hello\n", "/tmp", &name, "0644").await?;
    assert_eq!(written, 6);

    assert_eq!(read_remote(&client, &format!("/tmp/{name}")).await?, "hello\n");

    client.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn upload_larger_than_the_pipe() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let client = connect().await?;
    let name = format!("scp_{}", Uuid::new_v4());
    let data: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(FILE_SIZE)
        .map(char::from)
        .collect();

    let target = ScpTarget::new("/tmp", &name, "0600")?;
    let mut ctx = client.context().await?;
    let written = ScpUploader::default()
        .upload_bytes(&mut ctx, data.clone(), &target)
        .await?;
    assert_eq!(written, FILE_SIZE as u64);

    assert_eq!(read_remote(&client, &format!("/tmp/{name}")).await?, data);

    client.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn upload_into_missing_dir_fails() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let client = connect().await?;
    let dir = format!("/tmp/missing_{}", Uuid::new_v4());

    let mut ctx = client.context().await?;
    let ret = upload_str(&mut ctx, "x", &dir, "a", "0644").await;
    assert!(ret.is_err());

    client.disconnect().await?;
    Ok(())
}
