//! Snapshot apply and list commands

use clap::{Args, Subcommand};
use skiff_engine::SnapshotLifecycleController;
use skiff_store::{FsObjectStore, SnapshotLedger, SqliteLiveStore};

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub command: SnapshotCommand,
}

#[derive(Debug, Subcommand)]
pub enum SnapshotCommand {
    /// Apply an exported snapshot to the live environment
    Apply(ApplyArgs),
    /// List recorded apply invocations, newest first
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Object storage bucket holding the export
    #[arg(long)]
    pub bucket: String,

    /// Path prefix the export lives under within the bucket
    #[arg(long)]
    pub path: String,

    #[arg(long, default_value = ".skiff/live.db")]
    pub db: String,

    /// Root directory of the filesystem object store
    #[arg(long, default_value = ".skiff/objects")]
    pub object_root: String,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, default_value = ".skiff/live.db")]
    pub db: String,
}

pub fn execute(args: SnapshotArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        SnapshotCommand::Apply(apply_args) => execute_apply(apply_args),
        SnapshotCommand::List(list_args) => execute_list(list_args),
    }
}

fn open_store(db: &str) -> Result<SqliteLiveStore, Box<dyn std::error::Error>> {
    if let Some(parent) = std::path::Path::new(db).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(SqliteLiveStore::open(db)?)
}

fn execute_apply(args: ApplyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let objects = FsObjectStore::new(&args.object_root);
    let controller = SnapshotLifecycleController::new(&objects, &store, &store);

    let report = controller.apply_snapshot(&args.bucket, &args.path)?;

    println!("Snapshot applied:");
    println!("  snapshot_id: {}", report.snapshot.snapshot_id);
    println!("  status: {}", report.snapshot.status.as_str());
    for stats in &report.commit.tables {
        println!(
            "  {}: {} created, {} updated",
            stats.table.as_str(),
            stats.created,
            stats.updated
        );
    }

    Ok(())
}

fn execute_list(args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let snapshots = store.list()?;

    if snapshots.is_empty() {
        println!("No snapshots recorded");
        return Ok(());
    }

    for snapshot in snapshots {
        let mut line = format!(
            "{}  {:<11}  {}/{}",
            snapshot.snapshot_id,
            snapshot.status.as_str(),
            snapshot.bucket,
            snapshot.path
        );
        if let Some(reason) = &snapshot.failure_reason {
            line.push_str(&format!("  ({reason})"));
        }
        println!("{line}");
    }

    Ok(())
}
