use std::error;

use async_ssh2_toolkit::{
    run_commands, AcceptAnyHostKey, CaptureBuffer, Client, ClientConfig, Error,
    SessionConfiguration,
};

use super::helpers::{get_endpoint, get_privatekey_path, get_username, init_logger};

//
async fn connect() -> Result<Client, Box<dyn error::Error>> {
    let config =
        ClientConfig::private_key_file(get_username(), get_privatekey_path(), AcceptAnyHostKey);
    Ok(Client::connect(&get_endpoint(), config).await?)
}

#[tokio::test]
async fn connect_applies_the_session_configuration() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let mut session = SessionConfiguration::new();
    session.set_timeout(10_000);
    session.set_compress(true);
    let mut config =
        ClientConfig::private_key_file(get_username(), get_privatekey_path(), AcceptAnyHostKey);
    config.set_session_configuration(session);

    let client = Client::connect(&get_endpoint(), config).await?;
    assert_eq!(client.endpoint(), &get_endpoint());
    assert!(client.session().authenticated());
    assert_eq!(client.session().timeout(), 10_000);

    client.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn shell_output_is_captured() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let client = connect().await?;
    let stdout = CaptureBuffer::new();

    let mut ctx = client.context().await?;
    ctx.set_stdout(stdout.clone())?;
    run_commands(&mut ctx, ["echo a", "echo b", "exit"]).await?;

    assert_eq!(stdout.to_string_lossy(), "a\nb\n");

    client.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn exit_status_of_the_shell_is_reported() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let client = connect().await?;

    let mut ctx = client.context().await?;
    let ret = run_commands(&mut ctx, ["exit 3"]).await;
    assert!(matches!(ret, Err(Error::RemoteExit { status: 3 })));

    client.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn exec_captures_stdout_and_stderr() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let client = connect().await?;
    let stdout = CaptureBuffer::new();
    let stderr = CaptureBuffer::new();

    let mut ctx = client.context().await?;
    ctx.set_stdout(stdout.clone())?;
    ctx.set_stderr(stderr.clone())?;
    ctx.run("echo out; echo err >&2").await?;

    assert_eq!(stdout.to_string_lossy(), "out\n");
    assert_eq!(stderr.to_string_lossy(), "err\n");

    client.disconnect().await?;
    Ok(())
}
