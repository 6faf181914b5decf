//! `notebook` command-line front end.
//!
//! Opens the database named by `--database` or `NOTEBOOK_DATABASE_PATH` and
//! runs one operation against it. Structured results are printed as JSON on
//! stdout; failures print a short message on stderr and exit non-zero.

use clap::{Parser, Subcommand};
use notebook_core::{
    ExportOptions, NewImage, NewNode, NodeUpdate, Notebook, NotebookConfig, Result,
    EXPORT_FILENAME,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "notebook", version, about = "Hierarchical note store")]
struct Cli {
    /// SQLite database file; overrides NOTEBOOK_DATABASE_PATH.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the ordered forest of all nodes.
    Tree,
    /// Print the number of stored nodes.
    Count,
    /// Find nodes whose title or text contains QUERY.
    Search { query: String },
    /// Print a single node.
    Show { id: i64 },
    /// Create a document or folder.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long)]
        parent: Option<i64>,
        #[arg(long)]
        folder: bool,
    },
    /// Change the supplied fields of a node.
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, conflicts_with = "root")]
        parent: Option<i64>,
        /// Move the node to the top level.
        #[arg(long)]
        root: bool,
        #[arg(long)]
        position: Option<i32>,
    },
    /// Delete a node with all its descendants and images.
    Delete { id: i64 },
    /// Delete every node and image.
    DeleteAll {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Export nodes to one Markdown document.
    Export {
        /// Write to this file instead of stdout. A directory gets notebook_export.md.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Only export this node and its descendants.
        #[arg(long)]
        root: Option<i64>,
        #[arg(long)]
        skip_folders: bool,
    },
    /// Attach an image file to a node.
    Attach {
        id: i64,
        file: PathBuf,
        /// Defaults to a guess from the file extension.
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Move nodes with broken parent links to the top level.
    Repair,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = NotebookConfig::from_env();
    if let Some(path) = cli.database {
        config = config.with_database_path(path);
    }

    if !is_confirmed(&cli.command) {
        eprintln!("error: refusing to delete everything without --yes");
        return ExitCode::FAILURE;
    }

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &NotebookConfig) -> Result<()> {
    let mut notebook = Notebook::open_with(config)?;

    match command {
        Command::Tree => print_json(&notebook.tree()?),
        Command::Count => {
            println!("{}", notebook.count_nodes()?);
            Ok(())
        }
        Command::Search { query } => print_json(&notebook.search(&query)?),
        Command::Show { id } => print_json(&notebook.get_node(id)?),
        Command::Create {
            title,
            content,
            parent,
            folder,
        } => {
            let new = NewNode {
                title,
                content,
                parent_id: parent,
                is_folder: folder,
            };
            print_json(&notebook.create_node(new)?)
        }
        Command::Update {
            id,
            title,
            content,
            parent,
            root,
            position,
        } => {
            let update = node_update(title, content, parent, root, position);
            print_json(&notebook.update_node(id, update)?)
        }
        Command::Delete { id } => print_json(&notebook.delete_node(id)?),
        Command::DeleteAll { .. } => print_json(&notebook.delete_all()?),
        Command::Export {
            output,
            root,
            skip_folders,
        } => {
            let options = ExportOptions {
                include_folders: !skip_folders,
                root,
            };
            match output {
                Some(path) => {
                    let path = export_path(path);
                    notebook.export_to_file(&path, &options)?;
                    log::info!("export written to {}", path.display());
                    Ok(())
                }
                None => {
                    print!("{}", notebook.export_markdown_with(&options)?);
                    Ok(())
                }
            }
        }
        Command::Attach {
            id,
            file,
            content_type,
        } => {
            let image = read_image(&file, content_type)?;
            print_json(&notebook.add_image(id, image)?)
        }
        Command::Repair => print_json(&notebook.repair_links()?),
    }
}

fn is_confirmed(command: &Command) -> bool {
    !matches!(command, Command::DeleteAll { yes: false })
}

fn node_update(
    title: Option<String>,
    content: Option<String>,
    parent: Option<i64>,
    root: bool,
    position: Option<i32>,
) -> NodeUpdate {
    let parent_id = if root { Some(None) } else { parent.map(Some) };
    NodeUpdate {
        title,
        content,
        parent_id,
        position,
    }
}

fn export_path(path: PathBuf) -> PathBuf {
    if path.is_dir() {
        path.join(EXPORT_FILENAME)
    } else {
        path
    }
}

fn read_image(path: &Path, content_type: Option<String>) -> Result<NewImage> {
    let data = std::fs::read(path)?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let content_type = content_type.unwrap_or_else(|| {
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    });
    Ok(NewImage {
        filename,
        content_type,
        data,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_update_with_root() {
        let cli = Cli::try_parse_from(["notebook", "update", "4", "--root", "--position", "2"]).unwrap();
        let Command::Update { id, parent, root, position, .. } = cli.command else {
            panic!("expected update");
        };
        assert_eq!(id, 4);
        assert_eq!(parent, None);
        assert!(root);
        assert_eq!(position, Some(2));
    }

    #[test]
    fn test_parent_and_root_conflict() {
        let result = Cli::try_parse_from(["notebook", "update", "4", "--root", "--parent", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_all_requires_confirmation() {
        let cli = Cli::try_parse_from(["notebook", "delete-all"]).unwrap();
        assert!(!is_confirmed(&cli.command));

        let cli = Cli::try_parse_from(["notebook", "delete-all", "--yes"]).unwrap();
        assert!(is_confirmed(&cli.command));
        assert!(is_confirmed(&Command::Count));
    }

    #[test]
    fn test_global_database_flag() {
        let cli = Cli::try_parse_from(["notebook", "count", "--database", "/tmp/x.db"]).unwrap();
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/x.db")));
    }

    #[test]
    fn test_node_update_parent_states() {
        assert_eq!(node_update(None, None, None, false, None).parent_id, None);
        assert_eq!(node_update(None, None, Some(3), false, None).parent_id, Some(Some(3)));
        assert_eq!(node_update(None, None, None, true, None).parent_id, Some(None));
    }

    #[test]
    fn test_export_path_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(export_path(dir.path().to_path_buf()), dir.path().join("notebook_export.md"));

        let file = dir.path().join("out.md");
        assert_eq!(export_path(file.clone()), file);
    }

    #[test]
    fn test_read_image_guesses_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let image = read_image(&path, None).unwrap();
        assert_eq!(image.filename, "photo.png");
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.data, vec![1, 2, 3]);

        let image = read_image(&path, Some("image/x-custom".to_string())).unwrap();
        assert_eq!(image.content_type, "image/x-custom");
    }

    #[test]
    fn test_run_against_temp_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = NotebookConfig::default().with_database_path(dir.path().join("nb.db"));

        run(
            Command::Create {
                title: "Hello".to_string(),
                content: String::new(),
                parent: None,
                folder: false,
            },
            &config,
        )
        .unwrap();

        let notebook = Notebook::open_with(&config).unwrap();
        assert_eq!(notebook.count_nodes().unwrap(), 1);
        drop(notebook);

        let missing = run(Command::Show { id: 99 }, &config).unwrap_err();
        assert_eq!(missing.user_message(), "Document not found");
    }
}
