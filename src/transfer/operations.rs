//! Transfer operations: LIST, RETR and STOR.
//!
//! Each handler consumes the session's data channel up front, so a channel
//! serves exactly one transfer whatever the outcome. On success the handler
//! writes 150 to the control channel, moves the whole payload and leaves a
//! 226 reply for the session loop to flush.

use log::{info, warn};
use std::io;
use std::path::Path;
use tokio::io::AsyncWrite;

use crate::client::Session;
use crate::error::{StorageError, TransferError};
use crate::protocol::responses::{OPENING_DATA, Reply, TRANSFER_COMPLETE, write_reply};
use crate::server::ServerContext;
use crate::transfer::data_channel::{DataChannel, receive_payload, send_payload};

pub async fn handle_list<W>(
    session: &mut Session,
    argument: &str,
    ctx: &ServerContext,
    control: &mut W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let Some(channel) = session.take_data_channel() else {
        session.set_reply(TransferError::NoDataChannel.reply());
        return Ok(());
    };

    let path = list_target(argument)
        .map(|target| ctx.filesystem.resolve(session.cwd(), &target))
        .unwrap_or_else(|| session.cwd().to_path_buf());

    if !ctx.filesystem.exists(&path) || !ctx.filesystem.is_readable(&path) {
        session.set_reply(StorageError::DirectoryUnavailable(path).reply());
        return Ok(());
    }
    let listing = match ctx.filesystem.list_directory(&path) {
        Ok(listing) => listing,
        Err(e) => {
            warn!("Client {}: listing {} failed: {}", session.peer(), path.display(), e);
            session.set_reply(StorageError::DirectoryUnavailable(path).reply());
            return Ok(());
        }
    };

    write_reply(
        control,
        &Reply::new(OPENING_DATA, "Here comes the directory listing."),
    )
    .await?;

    match send(channel, listing.as_bytes(), ctx).await {
        Ok(()) => {
            info!("Client {} listed {}", session.peer(), path.display());
            session.set_reply(Reply::new(TRANSFER_COMPLETE, "Directory send OK."));
        }
        Err(e) => fail_transfer(session, e),
    }
    Ok(())
}

pub async fn handle_retr<W>(
    session: &mut Session,
    argument: &str,
    ctx: &ServerContext,
    control: &mut W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let Some(channel) = session.take_data_channel() else {
        session.set_reply(TransferError::NoDataChannel.reply());
        return Ok(());
    };

    let path = ctx.filesystem.resolve(session.cwd(), argument.trim());
    if argument.trim().is_empty()
        || !ctx.filesystem.is_file(&path)
        || !ctx.filesystem.is_readable(&path)
    {
        session.set_reply(StorageError::FileUnavailable(path).reply());
        return Ok(());
    }
    let contents = match ctx.filesystem.read_file(&path) {
        Ok(contents) => contents,
        Err(source) => {
            session.set_reply(StorageError::ReadFailed { path, source }.reply());
            return Ok(());
        }
    };

    write_reply(
        control,
        &Reply::new(
            OPENING_DATA,
            format!(
                "Opening BINARY mode data connection for {} ({} bytes).",
                argument.trim(),
                contents.len()
            ),
        ),
    )
    .await?;

    match send(channel, &contents, ctx).await {
        Ok(()) => {
            info!(
                "Client {} downloaded {} ({} bytes)",
                session.peer(),
                path.display(),
                contents.len()
            );
            session.set_reply(Reply::new(TRANSFER_COMPLETE, "Transfer complete."));
        }
        Err(e) => fail_transfer(session, e),
    }
    Ok(())
}

pub async fn handle_stor<W>(
    session: &mut Session,
    argument: &str,
    ctx: &ServerContext,
    control: &mut W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let Some(channel) = session.take_data_channel() else {
        session.set_reply(TransferError::NoDataChannel.reply());
        return Ok(());
    };

    let path = ctx.filesystem.resolve(session.cwd(), argument.trim());
    if argument.trim().is_empty() || path.file_name().is_none() || !parent_writable(&path, ctx) {
        session.set_reply(StorageError::NotWritable(path).reply());
        return Ok(());
    }

    write_reply(control, &Reply::new(OPENING_DATA, "Ok to send data.")).await?;

    let payload = match receive(channel, ctx).await {
        Ok(payload) => payload,
        Err(e) => {
            fail_transfer(session, e);
            return Ok(());
        }
    };

    match ctx.filesystem.write_file(&path, &payload) {
        Ok(()) => {
            info!(
                "Client {} uploaded {} ({} bytes)",
                session.peer(),
                path.display(),
                payload.len()
            );
            session.set_reply(Reply::new(TRANSFER_COMPLETE, "Transfer complete."));
        }
        Err(source) => {
            warn!("Client {}: writing {} failed: {}", session.peer(), path.display(), source);
            session.set_reply(StorageError::WriteFailed { path, source }.reply());
        }
    }
    Ok(())
}

/// Drops `ls` style flags (`-la`) and returns the path, if one remains.
fn list_target(argument: &str) -> Option<String> {
    let target = argument
        .split_whitespace()
        .filter(|token| !token.starts_with('-'))
        .collect::<Vec<_>>()
        .join(" ");
    (!target.is_empty()).then_some(target)
}

fn parent_writable(path: &Path, ctx: &ServerContext) -> bool {
    path.parent().is_some_and(|parent| {
        ctx.filesystem.is_directory(parent) && ctx.filesystem.is_writable(parent)
    })
}

async fn send(channel: DataChannel, payload: &[u8], ctx: &ServerContext) -> Result<(), TransferError> {
    let mut stream = channel
        .open(ctx.config.connect_timeout(), ctx.config.passive_timeout())
        .await?;
    send_payload(&mut stream, payload).await
}

async fn receive(channel: DataChannel, ctx: &ServerContext) -> Result<Vec<u8>, TransferError> {
    let mut stream = channel
        .open(ctx.config.connect_timeout(), ctx.config.passive_timeout())
        .await?;
    receive_payload(&mut stream).await
}

fn fail_transfer(session: &mut Session, error: TransferError) {
    warn!("Client {} transfer failed: {}", session.peer(), error);
    session.set_reply(error.reply());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LoginState;
    use crate::config::ServerConfig;
    use std::fs;
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn setup(root: &TempDir) -> (Session, ServerContext) {
        let ctx = ServerContext::local(ServerConfig {
            home_root: root.path().join("home"),
            passive_timeout_secs: 5,
            connect_timeout_secs: 5,
            ..ServerConfig::default()
        });
        let mut session = Session::new(
            "127.0.0.1:40000".parse().unwrap(),
            "127.0.0.1:2121".parse().unwrap(),
        );
        session.set_login(LoginState::Authenticated("cs472".into()));
        session.set_cwd(root.path().canonicalize().unwrap());
        (session, ctx)
    }

    fn passive(session: &mut Session) -> std::net::SocketAddr {
        let channel =
            DataChannel::listen(Ipv4Addr::LOCALHOST.into(), 50000..=60000, 100).unwrap();
        let endpoint = channel.endpoint();
        session.set_data_channel(channel);
        endpoint
    }

    #[test]
    fn list_flags_are_ignored() {
        assert_eq!(list_target("-la"), None);
        assert_eq!(list_target(""), None);
        assert_eq!(list_target("-l docs"), Some("docs".into()));
        assert_eq!(list_target("my dir"), Some("my dir".into()));
    }

    #[tokio::test]
    async fn list_streams_the_directory() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("notes.txt"), b"hello").unwrap();
        let (mut session, ctx) = setup(&root);
        let endpoint = passive(&mut session);

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(endpoint).await.unwrap();
            let mut body = String::new();
            stream.read_to_string(&mut body).await.unwrap();
            body
        });

        let mut control = Vec::new();
        handle_list(&mut session, "-a", &ctx, &mut control).await.unwrap();
        let body = client.await.unwrap();

        assert!(String::from_utf8(control).unwrap().starts_with("150 "));
        assert_eq!(session.reply().code(), 226);
        assert!(body.contains("notes.txt"));
        assert!(!session.has_data_channel());
    }

    #[tokio::test]
    async fn list_of_a_missing_path_is_550_and_consumes_the_channel() {
        let root = TempDir::new().unwrap();
        let (mut session, ctx) = setup(&root);
        passive(&mut session);

        let mut control = Vec::new();
        handle_list(&mut session, "nowhere", &ctx, &mut control).await.unwrap();
        assert!(control.is_empty());
        assert_eq!(session.reply().code(), 550);
        assert!(!session.has_data_channel());
    }

    #[tokio::test]
    async fn retr_sends_the_file_over_an_active_channel() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("data.bin"), b"0123456789").unwrap();
        let (mut session, ctx) = setup(&root);
        let client = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        session.set_data_channel(DataChannel::active(client.local_addr().unwrap()));

        let receiver = tokio::spawn(async move {
            let (mut stream, _) = client.accept().await.unwrap();
            let mut body = Vec::new();
            stream.read_to_end(&mut body).await.unwrap();
            body
        });

        let mut control = Vec::new();
        handle_retr(&mut session, "data.bin", &ctx, &mut control).await.unwrap();
        assert_eq!(receiver.await.unwrap(), b"0123456789");
        assert!(String::from_utf8(control).unwrap().contains("(10 bytes)"));
        assert_eq!(session.reply().code(), 226);
    }

    #[tokio::test]
    async fn retr_of_a_directory_is_550() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("sub")).unwrap();
        let (mut session, ctx) = setup(&root);
        passive(&mut session);

        let mut control = Vec::new();
        handle_retr(&mut session, "sub", &ctx, &mut control).await.unwrap();
        assert_eq!(session.reply().code(), 550);
    }

    #[tokio::test]
    async fn stor_writes_the_uploaded_bytes() {
        let root = TempDir::new().unwrap();
        let (mut session, ctx) = setup(&root);
        let endpoint = passive(&mut session);

        let sender = tokio::spawn(async move {
            let mut stream = TcpStream::connect(endpoint).await.unwrap();
            stream.write_all(b"uploaded").await.unwrap();
            stream.shutdown().await.unwrap();
        });

        let mut control = Vec::new();
        handle_stor(&mut session, "up.txt", &ctx, &mut control).await.unwrap();
        sender.await.unwrap();

        assert_eq!(session.reply().code(), 226);
        assert_eq!(fs::read(root.path().join("up.txt")).unwrap(), b"uploaded");
    }

    #[tokio::test]
    async fn stor_into_a_missing_directory_is_553() {
        let root = TempDir::new().unwrap();
        let (mut session, ctx) = setup(&root);
        passive(&mut session);

        let mut control = Vec::new();
        handle_stor(&mut session, "missing/up.txt", &ctx, &mut control).await.unwrap();
        assert_eq!(session.reply().code(), 553);
        handle_stor(&mut session, "", &ctx, &mut control).await.unwrap();
        assert_eq!(session.reply().code(), 425);
    }

    #[tokio::test]
    async fn active_connect_failure_is_550() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("a.txt"), b"a").unwrap();
        let (mut session, ctx) = setup(&root);
        let vacant = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let target = vacant.local_addr().unwrap();
        drop(vacant);
        session.set_data_channel(DataChannel::active(target));

        let mut control = Vec::new();
        tokio::time::timeout(
            Duration::from_secs(10),
            handle_retr(&mut session, "a.txt", &ctx, &mut control),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(session.reply().code(), 550);
    }
}
