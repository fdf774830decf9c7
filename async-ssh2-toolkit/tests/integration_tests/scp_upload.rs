use std::{error, io::Cursor, time::Duration};

use async_ssh2_toolkit::{
    upload, upload_str, CancellationToken, ContextState, Error, ExecContext, ScpTarget,
    ScpUploader, UploadConfiguration,
};

use super::{
    helpers::init_logger,
    stub::{read_count, CountingReader, Event, Recorder, StubProcess},
};

//
#[tokio::test]
async fn upload_str_writes_header_payload_and_terminator() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let recorder = Recorder::default();
    let mut ctx = ExecContext::new(StubProcess::new(&recorder).wait_for_stdin_close());

    let written = upload_str(&mut ctx, "hi", "/tmp", "hello.txt", "0644").await?;

    assert_eq!(written, 2);
    assert_eq!(
        recorder.writes(),
        vec![b"C0644 2 hello.txt\n".to_vec(), b"hi".to_vec(), b"\0".to_vec()]
    );
    assert_eq!(recorder.commands(), vec!["/usr/bin/scp -qtr /tmp".to_owned()]);
    assert!(recorder.stdin_closed());
    assert_eq!(ctx.state(), ContextState::Finished);

    Ok(())
}

#[tokio::test]
async fn empty_content_sends_header_then_terminator() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let recorder = Recorder::default();
    let mut ctx = ExecContext::new(StubProcess::new(&recorder).wait_for_stdin_close());

    let written = upload_str(&mut ctx, "", "/tmp", "hello.txt", "0644").await?;

    assert_eq!(written, 0);
    assert_eq!(
        recorder.writes(),
        vec![b"C0644 0 hello.txt\n".to_vec(), b"\0".to_vec()]
    );
    assert!(recorder.stdin_closed());

    Ok(())
}

#[tokio::test]
async fn copies_exactly_the_declared_length() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let recorder = Recorder::default();
    let mut ctx = ExecContext::new(StubProcess::new(&recorder).wait_for_stdin_close());
    let (source, read) = CountingReader::new(b"hello world");

    let written = upload(&mut ctx, source, 5, "/tmp", "greeting.txt", "0644").await?;

    assert_eq!(written, 5);
    assert_eq!(read_count(&read), 5);
    assert_eq!(
        recorder.writes(),
        vec![
            b"C0644 5 greeting.txt\n".to_vec(),
            b"hello".to_vec(),
            b"\0".to_vec()
        ]
    );

    Ok(())
}

#[tokio::test]
async fn payload_is_streamed_in_buffer_sized_chunks() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let recorder = Recorder::default();
    let mut ctx = ExecContext::new(StubProcess::new(&recorder).wait_for_stdin_close());

    let mut configuration = UploadConfiguration::new();
    configuration.set_buffer_size(4);
    let uploader = ScpUploader::new(configuration);
    let target = ScpTarget::new("/data", "digits", "0600")?;

    let written = uploader
        .upload(&mut ctx, Cursor::new(b"0123456789".to_vec()), 10, &target)
        .await?;

    assert_eq!(written, 10);
    assert_eq!(
        recorder.writes(),
        vec![
            b"C0600 10 digits\n".to_vec(),
            b"0123".to_vec(),
            b"4567".to_vec(),
            b"89".to_vec(),
            b"\0".to_vec()
        ]
    );

    Ok(())
}

#[tokio::test]
async fn short_source_is_an_error_without_terminator() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let recorder = Recorder::default();
    let mut ctx = ExecContext::new(StubProcess::new(&recorder).wait_for_stdin_close());

    let ret = upload(&mut ctx, Cursor::new(b"hi".to_vec()), 5, "/tmp", "a", "0644").await;

    assert!(matches!(
        ret,
        Err(Error::ShortCopy {
            expected: 5,
            copied: 2
        })
    ));
    assert_eq!(
        recorder.writes(),
        vec![b"C0644 5 a\n".to_vec(), b"hi".to_vec()]
    );
    assert!(recorder.stdin_closed());

    Ok(())
}

#[tokio::test]
async fn remote_failure_is_returned_without_waiting_for_the_writer(
) -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let recorder = Recorder::default();
    let mut ctx = ExecContext::new(StubProcess::new(&recorder).exit_status(1));

    // Never yields a byte while `_source_tx` is alive.
    let (_source_tx, source) = tokio::io::duplex(16);

    let ret = tokio::time::timeout(
        Duration::from_secs(5),
        upload(&mut ctx, source, 10, "/missing", "a", "0644"),
    )
    .await?;

    assert!(matches!(ret, Err(Error::RemoteExit { status: 1 })));
    assert!(recorder.wait_stdin_closed().await);
    assert!(!recorder.writes().contains(&b"\0".to_vec()));

    Ok(())
}

#[tokio::test]
async fn writer_outcome_is_returned_after_an_early_clean_exit(
) -> Result<(), Box<dyn error::Error>> {
    init_logger();

    // Exits 0 without waiting for stdin to close.
    let recorder = Recorder::default();
    let mut ctx = ExecContext::new(StubProcess::new(&recorder));

    let (source_tx, source) = tokio::io::duplex(16);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(source_tx);
    });

    let ret = tokio::time::timeout(
        Duration::from_secs(5),
        upload(&mut ctx, source, 4, "/tmp", "late", "0644"),
    )
    .await?;

    assert!(matches!(
        ret,
        Err(Error::ShortCopy {
            expected: 4,
            copied: 0
        })
    ));
    assert_eq!(recorder.writes(), vec![b"C0644 4 late\n".to_vec()]);
    assert!(recorder.wait_stdin_closed().await);
    assert!(!recorder.events().contains(&Event::Abort));

    Ok(())
}

#[tokio::test]
async fn failed_write_stops_the_transfer() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let recorder = Recorder::default();
    let mut ctx = ExecContext::new(
        StubProcess::new(&recorder)
            .wait_for_stdin_close()
            .fail_write_at(1),
    );

    let ret = upload_str(&mut ctx, "payload", "/tmp", "a", "0644").await;

    assert!(matches!(ret, Err(Error::Io(_))));
    assert_eq!(recorder.writes(), vec![b"C0644 7 a\n".to_vec()]);
    assert!(recorder.stdin_closed());

    Ok(())
}

#[tokio::test]
async fn cancel_aborts_a_stalled_transfer() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let recorder = Recorder::default();
    let mut ctx = ExecContext::new(StubProcess::new(&recorder).wait_for_stdin_close());
    let (_source_tx, source) = tokio::io::duplex(16);
    let target = ScpTarget::new("/tmp", "stalled", "0644")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        }
    });

    let ret = tokio::time::timeout(
        Duration::from_secs(5),
        ScpUploader::default().upload_with_cancel(&mut ctx, source, 1024, &target, &cancel),
    )
    .await?;

    assert!(matches!(ret, Err(Error::Cancelled)));
    assert!(recorder.wait_stdin_closed().await);
    assert_eq!(recorder.writes(), vec![b"C0644 1024 stalled\n".to_vec()]);
    assert!(recorder.events().contains(&Event::Abort));
    assert_eq!(ctx.state(), ContextState::Finished);

    Ok(())
}

#[tokio::test]
async fn rejects_names_that_would_break_the_header() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let recorder = Recorder::default();
    let mut ctx = ExecContext::new(StubProcess::new(&recorder));

    let ret = upload_str(&mut ctx, "x", "/tmp", "a\nC0644 1 b", "0644").await;

    assert!(matches!(ret, Err(Error::InvalidArgument { .. })));
    assert!(recorder.events().is_empty());
    assert_eq!(ctx.state(), ContextState::Idle);

    Ok(())
}

#[tokio::test]
async fn scp_path_is_configurable_and_dir_is_quoted() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let recorder = Recorder::default();
    let mut ctx = ExecContext::new(StubProcess::new(&recorder).wait_for_stdin_close());

    let mut configuration = UploadConfiguration::new();
    configuration.set_scp_path("/opt/bin/scp");
    let target = ScpTarget::new("/srv/my files", "notes.txt", "0640")?;

    ScpUploader::new(configuration)
        .upload_bytes(&mut ctx, "notes", &target)
        .await?;

    assert_eq!(
        recorder.commands(),
        vec!["/opt/bin/scp -qtr '/srv/my files'".to_owned()]
    );

    Ok(())
}

#[tokio::test]
async fn context_cannot_be_reused_for_a_second_upload() -> Result<(), Box<dyn error::Error>> {
    init_logger();

    let recorder = Recorder::default();
    let mut ctx = ExecContext::new(StubProcess::new(&recorder).wait_for_stdin_close());

    upload_str(&mut ctx, "one", "/tmp", "a", "0644").await?;
    let ret = upload_str(&mut ctx, "two", "/tmp", "b", "0644").await;

    assert!(matches!(
        ret,
        Err(Error::InvalidState {
            state: ContextState::Finished,
            ..
        })
    ));
    assert_eq!(recorder.commands().len(), 1);

    Ok(())
}
