use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

use dataprep::{
    config::Config,
    models::{FileHandle, FolderHandle, SiteModel, UserModel},
    services::repository::{DataContent, Protocol, SessionContext},
};

fn cli() -> Command {
    let site = || {
        Arg::new("site")
            .help("Site whose document library is the working space")
            .long("site")
            .short('s')
            .value_name("SITE_ID")
            .required(true)
    };

    Command::new("dataprep")
        .about("Prepare and inspect test data in a content repository")
        .subcommand_required(true)
        .arg(
            Arg::new("user")
                .help("Act as this user instead of the configured admin")
                .long("user")
                .short('u')
                .global(true),
        )
        .arg(
            Arg::new("password")
                .help("Password for --user")
                .long("password")
                .short('p')
                .global(true),
        )
        .subcommand(Command::new("version").about("Show the server version and the protocol in use"))
        .subcommand(
            Command::new("create-folder")
                .about("Create a folder in a site document library")
                .arg(site())
                .arg(Arg::new("name").help("Folder name; random when omitted").index(1))
                .arg(Arg::new("title").long("title"))
                .arg(Arg::new("description").long("description")),
        )
        .subcommand(
            Command::new("create-file")
                .about("Create a file with content in a site document library")
                .arg(site())
                .arg(Arg::new("name").help("File name").required(true).index(1))
                .arg(Arg::new("content").long("content").short('c')),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete the resource at a repository path")
                .arg(Arg::new("path").required(true).index(1)),
        )
        .subcommand(
            Command::new("exists")
                .about("Check whether a repository path exists")
                .arg(Arg::new("path").required(true).index(1)),
        )
}

fn session_for(data: &DataContent, matches: &ArgMatches) -> SessionContext {
    let session = data.new_session();
    match matches.get_one::<String>("user") {
        Some(user) => {
            let password = matches.get_one::<String>("password").cloned().unwrap_or_default();
            session.using_user(UserModel::new(user.clone(), password))
        }
        None => data.using_admin(session),
    }
}

fn site_session(data: &DataContent, matches: &ArgMatches) -> Result<SessionContext> {
    let site = matches
        .get_one::<String>("site")
        .ok_or_else(|| anyhow::anyhow!("--site is required"))?;
    Ok(session_for(data, matches).using_site(&SiteModel::new(site.clone())))
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    let matches = cli().get_matches();

    let config = Config::from_env()?;
    let data = DataContent::from_config(&config)?;

    match matches.subcommand() {
        Some(("version", sub)) => {
            let session = session_for(&data, sub);
            let version = data.connection().server_version(data.admin()).await?;
            let protocol = data.protocol(&session).await?;
            println!("Server version: {}", version);
            println!("Protocol: {}", protocol);
            if protocol == Protocol::Legacy {
                println!("This binary carries no legacy binding; content commands need a 5.2+ server.");
            }
        }
        Some(("create-folder", sub)) => {
            let mut session = site_session(&data, sub)?;
            let mut folder = match sub.get_one::<String>("name") {
                Some(name) => FolderHandle::new(name.clone()),
                None => FolderHandle::random(),
            };
            if let Some(title) = sub.get_one::<String>("title") {
                folder = folder.with_title(title.clone());
            }
            if let Some(description) = sub.get_one::<String>("description") {
                folder = folder.with_description(description.clone());
            }

            let folder = data.create_folder_with(&mut session, folder).await?;
            println!(
                "{}\t{}",
                folder.resource.node_ref().unwrap_or_default(),
                folder.resource.protocol_path()
            );
        }
        Some(("create-file", sub)) => {
            let mut session = site_session(&data, sub)?;
            let name = sub
                .get_one::<String>("name")
                .ok_or_else(|| anyhow::anyhow!("a file name is required"))?;
            let mut file = FileHandle::new(name.clone());
            if let Some(content) = sub.get_one::<String>("content") {
                file = file.with_content(content.clone());
            }

            let file = data.create_content(&mut session, file).await?;
            println!(
                "{}\t{}",
                file.resource.node_ref().unwrap_or_default(),
                file.resource.protocol_path()
            );
        }
        Some(("delete", sub)) => {
            let mut session = session_for(&data, sub);
            let path = sub
                .get_one::<String>("path")
                .ok_or_else(|| anyhow::anyhow!("a path is required"))?;
            session.set_last_resource(path.clone());
            data.delete_content(&mut session).await?;
            println!("Deleted {}", path);
        }
        Some(("exists", sub)) => {
            let mut session = session_for(&data, sub);
            let path = sub
                .get_one::<String>("path")
                .ok_or_else(|| anyhow::anyhow!("a path is required"))?;
            session.set_last_resource(path.clone());
            match data.node_ref(&mut session).await? {
                Some(id) => println!("{}\t{}", id, path),
                None => {
                    eprintln!("{} does not exist", path);
                    std::process::exit(1);
                }
            }
        }
        _ => unreachable!("clap enforces a subcommand"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_create_file_requires_site() {
        let result = cli().try_get_matches_from(["dataprep", "create-file", "a.txt"]);
        assert!(result.is_err());

        let matches = cli()
            .try_get_matches_from(["dataprep", "create-file", "a.txt", "--site", "test", "-c", "hi"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "create-file");
        assert_eq!(sub.get_one::<String>("site").map(String::as_str), Some("test"));
        assert_eq!(sub.get_one::<String>("content").map(String::as_str), Some("hi"));
    }

    #[test]
    fn test_global_user_flag() {
        let matches = cli()
            .try_get_matches_from(["dataprep", "exists", "/Sites", "--user", "alice"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<String>("user").map(String::as_str), Some("alice"));
    }
}
