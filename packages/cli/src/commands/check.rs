use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_model::{Node, Schema};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Document JSON file or directory of documents
    pub input: PathBuf,

    /// List valid documents too
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn check(args: CheckArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let schema = config.load_schema(cwd)?;

    println!("🔍 {} Folio document check", "Starting".green().bold());
    println!("   Input: {}", args.input.display());
    println!();

    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        let files = find_json_files(&args.input);
        println!("   Found {} .json files", files.len());
        println!();
        files
    } else {
        return Err(anyhow::anyhow!(
            "Input path does not exist: {}",
            args.input.display()
        ));
    };

    let mut failures = 0;
    for file in &files {
        match check_file(file, &schema) {
            Ok(doc) => {
                if args.verbose {
                    println!(
                        "{} {} ({} positions)",
                        "✓".green(),
                        file.display(),
                        doc.content().size()
                    );
                }
            }
            Err(err) => {
                failures += 1;
                eprintln!("{} {}: {}", "✗".red(), file.display(), err);
            }
        }
    }

    println!();
    println!("   Files checked: {}", files.len());
    if failures > 0 {
        return Err(anyhow::anyhow!("{} invalid document(s)", failures));
    }
    println!("   {} All documents are valid", "✓".green());
    Ok(())
}

/// Parse a document and check it against `schema`.
pub fn check_file(path: &Path, schema: &Schema) -> Result<Node> {
    let source = fs::read_to_string(path)?;
    let doc = Node::from_json_str(schema, &source)?;
    doc.check()?;
    if doc.node_type() != &schema.top_node_type() {
        return Err(anyhow::anyhow!(
            "Top node is {}, expected {}",
            doc.node_type().name(),
            schema.top_node_type().name()
        ));
    }
    Ok(doc)
}

fn find_json_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
        .filter(|e| e.file_name() != crate::config::DEFAULT_CONFIG_NAME)
        .map(|e| e.path().to_path_buf())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_schema_basic::{doc, p, schema};
    use tempfile::TempDir;

    fn write_doc(dir: &Path, name: &str, json: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_valid_document_passes() {
        let dir = TempDir::new().unwrap();
        let source = serde_json::to_string(&doc![p!["hi"]].to_json()).unwrap();
        let path = write_doc(dir.path(), "doc.json", &source);
        let parsed = check_file(&path, &schema()).unwrap();
        assert_eq!(parsed.to_string(), r#"doc(paragraph("hi"))"#);
    }

    #[test]
    fn test_invalid_content_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_doc(
            dir.path(),
            "bad.json",
            r#"{"type": "doc", "content": [{"type": "text", "text": "loose"}]}"#,
        );
        assert!(check_file(&path, &schema()).is_err());
    }

    #[test]
    fn test_non_top_node_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_doc(dir.path(), "para.json", r#"{"type": "paragraph"}"#);
        let err = check_file(&path, &schema()).unwrap_err();
        assert!(err.to_string().contains("Top node is paragraph"));
    }

    #[test]
    fn test_directory_walk_skips_config() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "a.json", "{}");
        write_doc(dir.path(), crate::config::DEFAULT_CONFIG_NAME, "{}");
        fs::create_dir(dir.path().join("nested")).unwrap();
        write_doc(&dir.path().join("nested"), "b.json", "{}");
        write_doc(dir.path(), "notes.txt", "");
        assert_eq!(find_json_files(dir.path()).len(), 2);
    }
}
