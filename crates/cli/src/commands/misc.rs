//! The CLI's non-pass-running subcommands: config generation, cache/health
//! maintenance, notification testing, and metafile inspection.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use xseed_core::{
    render_default_config, Database, DecisionStore, IndexerStore, Metafile, Notification,
    NotifierHandle, SettingsStore, SqliteDecisionStore, SqliteIndexerStore,
};

pub fn gen_config(docker: bool) {
    print!("{}", render_default_config(docker));
}

pub async fn clear_cache(database_path: &Path) -> Result<()> {
    let db = Database::open(database_path).context("opening database")?;
    let store = SqliteDecisionStore::new(db);
    let removed = store.clear_cache().await.context("clearing decision cache")?;
    println!("cleared {} cached decision(s)", removed);
    Ok(())
}

pub async fn clear_indexer_failures(database_path: &Path) -> Result<()> {
    let db = Database::open(database_path).context("opening database")?;
    let store = SqliteIndexerStore::new(db);
    store.clear_failures().await.context("clearing indexer failures")?;
    println!("cleared health status and cooldown on every indexer");
    Ok(())
}

pub async fn test_notification(webhook_url: Option<String>, config_webhook_url: Option<String>) -> Result<()> {
    let Some(url) = webhook_url.or(config_webhook_url) else {
        anyhow::bail!("no notification webhook URL set: pass --notification-webhook-url or configure one");
    };

    let (handle, writer) = xseed_core::create_notifier(url, 1);
    let writer_task = tokio::spawn(writer.run());
    send_test(&handle).await;
    drop(handle);
    writer_task.await.context("notifier writer task panicked")?;

    println!("{}", "test notification sent".green());
    Ok(())
}

async fn send_test(handle: &NotifierHandle) {
    handle.emit(Notification::new("xseed test notification", "this is a test notification from xseed")).await;
}

pub fn diff(a: &Path, b: &Path) -> Result<()> {
    let meta_a = parse_torrent_file(a)?;
    let meta_b = parse_torrent_file(b)?;

    println!("{}", a.display().to_string().bold());
    println!("{}", meta_a.tree());
    println!();
    println!("{}", b.display().to_string().bold());
    println!("{}", meta_b.tree());
    println!();

    if meta_a.info_hash == meta_b.info_hash {
        println!("{}", "identical infohash".green());
        return Ok(());
    }

    let files_a: std::collections::BTreeSet<_> =
        meta_a.files.iter().map(|f| (f.relative_path(), f.length)).collect();
    let files_b: std::collections::BTreeSet<_> =
        meta_b.files.iter().map(|f| (f.relative_path(), f.length)).collect();

    if files_a == files_b {
        println!("same file tree, different infohash (re-encoded metafile)");
        return Ok(());
    }

    let mut rows = Vec::new();
    for (path, size) in files_a.union(&files_b) {
        let in_a = files_a.contains(&(path.clone(), *size));
        let in_b = files_b.contains(&(path.clone(), *size));
        rows.push(DiffRow {
            path: path.clone(),
            size: *size,
            in_a: if in_a { "x".to_string() } else { String::new() },
            in_b: if in_b { "x".to_string() } else { String::new() },
        });
    }
    println!("{}", Table::new(rows).with(Style::rounded()));

    Ok(())
}

#[derive(Tabled)]
struct DiffRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Size")]
    size: u64,
    #[tabled(rename = "A")]
    in_a: String,
    #[tabled(rename = "B")]
    in_b: String,
}

pub fn tree(torrent: &Path) -> Result<()> {
    let meta = parse_torrent_file(torrent)?;
    println!("{}", meta.tree());
    Ok(())
}

fn parse_torrent_file(path: &Path) -> Result<Metafile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Metafile::parse(&bytes).map_err(|e| anyhow::anyhow!("parsing {}: {}", path.display(), e))
}

pub fn api_key(settings: &SettingsStore) -> Result<()> {
    let key = settings.get_or_create_api_key().context("loading admin API key")?;
    println!("{}", key);
    Ok(())
}

pub fn reset_api_key(settings: &SettingsStore) -> Result<()> {
    let key = settings.reset_api_key().context("resetting admin API key")?;
    println!("{}", key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_str(s: &str) -> String {
        format!("{}:{}", s.len(), s)
    }

    fn single_file_torrent(name: &str, length: u64) -> Vec<u8> {
        let info = format!(
            "d6:lengthi{}e4:name{}12:piece lengthi16384e6:pieces20:01234567890123456789e",
            length,
            encode_str(name)
        );
        format!("d8:announce20:http://tracker.test/4:info{}e", info).into_bytes()
    }

    fn write_torrent(dir: &tempfile::TempDir, filename: &str, name: &str, length: u64) -> std::path::PathBuf {
        let path = dir.path().join(filename);
        std::fs::write(&path, single_file_torrent(name, length)).unwrap();
        path
    }

    #[test]
    fn tree_reads_and_prints_a_valid_torrent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_torrent(&dir, "a.torrent", "foo.mkv", 1000);
        assert!(tree(&path).is_ok());
    }

    #[test]
    fn tree_rejects_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(tree(&dir.path().join("missing.torrent")).is_err());
    }

    #[test]
    fn diff_reports_identical_infohash_for_byte_identical_metafiles() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_torrent(&dir, "a.torrent", "foo.mkv", 1000);
        let b = write_torrent(&dir, "b.torrent", "foo.mkv", 1000);
        assert!(diff(&a, &b).is_ok());
    }

    #[test]
    fn diff_handles_different_file_trees() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_torrent(&dir, "a.torrent", "foo.mkv", 1000);
        let b = write_torrent(&dir, "b.torrent", "bar.mkv", 2000);
        assert!(diff(&a, &b).is_ok());
    }
}
