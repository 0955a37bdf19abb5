//! Navigation operations implementation

use log::{debug, info};

use crate::client::Session;
use crate::error::StorageError;
use crate::protocol::responses::{FILE_ACTION_OK, PATHNAME, Reply};
use crate::server::ServerContext;
use crate::storage::lexical_parent;

/// CWD: moves into `path` if it resolves to a readable directory.
pub fn handle_cwd(session: &mut Session, path: &str, ctx: &ServerContext) {
    let target = ctx.filesystem.resolve(session.cwd(), path.trim());
    if path.trim().is_empty()
        || !ctx.filesystem.is_directory(&target)
        || !ctx.filesystem.is_readable(&target)
    {
        debug!(
            "Client {} cannot change to {}",
            session.peer(),
            target.display()
        );
        session.set_reply(StorageError::NotADirectory(target).reply());
        return;
    }

    info!("Client {} changed to {}", session.peer(), target.display());
    session.set_cwd(target);
    session.set_reply(Reply::new(
        FILE_ACTION_OK,
        "Directory successfully changed.",
    ));
}

/// CDUP: moves to the lexical parent; the root stays where it is.
pub fn handle_cdup(session: &mut Session) {
    let parent = lexical_parent(session.cwd());
    session.set_cwd(parent);
    session.set_reply(Reply::new(
        FILE_ACTION_OK,
        "Directory successfully changed.",
    ));
}

pub fn handle_pwd(session: &mut Session) {
    let message = format!("\"{}\" is the current directory.", session.cwd().display());
    session.set_reply(Reply::new(PATHNAME, message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LoginState;
    use crate::config::ServerConfig;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn setup(root: &TempDir) -> (Session, ServerContext) {
        let ctx = ServerContext::local(ServerConfig {
            home_root: root.path().join("home"),
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

    #[test]
    fn cwd_into_a_directory_and_back_up() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("docs")).unwrap();
        let (mut session, ctx) = setup(&root);
        let base = session.cwd().to_path_buf();

        handle_cwd(&mut session, "docs", &ctx);
        assert_eq!(session.reply().code(), 250);
        assert_eq!(session.cwd(), base.join("docs"));

        handle_cdup(&mut session);
        assert_eq!(session.reply().code(), 250);
        assert_eq!(session.cwd(), base);
    }

    #[test]
    fn cwd_to_a_missing_or_regular_file_is_550() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("file.txt"), b"x").unwrap();
        let (mut session, ctx) = setup(&root);
        let before = session.cwd().to_path_buf();

        for target in ["missing", "file.txt", ""] {
            handle_cwd(&mut session, target, &ctx);
            assert_eq!(session.reply().code(), 550, "{target}");
            assert_eq!(session.cwd(), before);
        }
    }

    #[test]
    fn cdup_at_root_stays_at_root() {
        let root = TempDir::new().unwrap();
        let (mut session, _ctx) = setup(&root);
        session.set_cwd("/".into());
        handle_cdup(&mut session);
        assert_eq!(session.cwd(), Path::new("/"));
    }

    #[test]
    fn pwd_quotes_the_directory() {
        let root = TempDir::new().unwrap();
        let (mut session, _ctx) = setup(&root);
        session.set_cwd("/srv/ftp".into());
        handle_pwd(&mut session);
        assert_eq!(
            session.reply().to_wire(),
            "257 \"/srv/ftp\" is the current directory.\r\n"
        );
    }
}
