//! Deterministic depth-first rendering of a metafile's file list, for the
//! `tree` CLI operation.

use super::MetafileFile;
use std::collections::BTreeMap;

enum Node {
    Dir(BTreeMap<String, Node>),
    File(u64),
}

/// Renders `files` (each a list of path segments plus length) as an
/// indented tree under `root_name`, sorted lexically at every level so the
/// output is stable across runs regardless of input order.
pub fn render_tree(root_name: &str, files: &[MetafileFile]) -> String {
    let mut root: BTreeMap<String, Node> = BTreeMap::new();
    for file in files {
        insert(&mut root, &file.path, file.length);
    }

    let mut out = String::new();
    out.push_str(root_name);
    out.push('\n');
    render_dir(&root, "", &mut out);
    out
}

fn insert(dir: &mut BTreeMap<String, Node>, path: &[String], length: u64) {
    match path.split_first() {
        None => {}
        Some((head, &[])) => {
            dir.insert(head.clone(), Node::File(length));
        }
        Some((head, rest)) => {
            let entry = dir
                .entry(head.clone())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            if let Node::Dir(children) = entry {
                insert(children, rest, length);
            }
        }
    }
}

fn render_dir(dir: &BTreeMap<String, Node>, prefix: &str, out: &mut String) {
    let entries: Vec<_> = dir.iter().collect();
    for (i, (name, node)) in entries.iter().enumerate() {
        let is_last = i == entries.len() - 1;
        let branch = if is_last { "└── " } else { "├── " };
        let child_prefix = if is_last { "    " } else { "│   " };
        match node {
            Node::Dir(children) => {
                out.push_str(prefix);
                out.push_str(branch);
                out.push_str(name);
                out.push('\n');
                render_dir(children, &format!("{}{}", prefix, child_prefix), out);
            }
            Node::File(length) => {
                out.push_str(prefix);
                out.push_str(branch);
                out.push_str(name);
                out.push_str(&format!(" ({} bytes)\n", length));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_directories_sorted() {
        let files = vec![
            MetafileFile { path: vec!["b.txt".into()], length: 10 },
            MetafileFile { path: vec!["a".into(), "z.mkv".into()], length: 20 },
            MetafileFile { path: vec!["a".into(), "a.mkv".into()], length: 30 },
        ];
        let rendered = render_tree("Show", &files);
        let a_pos = rendered.find("a\n").unwrap();
        let a_mkv_pos = rendered.find("a.mkv").unwrap();
        let z_mkv_pos = rendered.find("z.mkv").unwrap();
        let b_txt_pos = rendered.find("b.txt").unwrap();
        assert!(a_pos < a_mkv_pos);
        assert!(a_mkv_pos < z_mkv_pos);
        assert!(z_mkv_pos < b_txt_pos);
    }
}
