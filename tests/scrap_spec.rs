use std::fs;
use std::path::Path;

use chrono::{Duration, Utc};
use scrap::models::*;
use scrap::{Config, ScrapError, Scrapyard};
use speculate2::speculate;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent");
    }
    fs::write(path, content).expect("Failed to write file");
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).expect("Failed to read file")
}

speculate! {
    before {
        let sandbox = tempfile::tempdir().expect("Failed to create temp dir");
        let root = sandbox.path().canonicalize().expect("Failed to canonicalize");
        let yard = Scrapyard::open(&root, &Config::default()).expect("Failed to open scrapyard");
    }

    describe "open" {
        it "creates the scrap directory" {
            assert!(root.join(".scrap").is_dir());
            assert_eq!(yard.scrap_dir(), root.join(".scrap"));
        }

        it "adds the scrap directory to .gitignore" {
            assert_eq!(read(&root, ".gitignore"), ".scrap/\n");
        }

        it "does not duplicate the gitignore line when reopened" {
            drop(yard);
            Scrapyard::open(&root, &Config::default()).expect("Failed to reopen");
            Scrapyard::open(&root, &Config::default()).expect("Failed to reopen");

            assert_eq!(read(&root, ".gitignore").matches(".scrap").count(), 1);
        }

        it "keeps existing gitignore content" {
            let other = tempfile::tempdir().expect("Failed to create temp dir");
            write(other.path(), ".gitignore", "target/\n# editor\n*.swp");

            Scrapyard::open(other.path(), &Config::default()).expect("Failed to open");

            assert_eq!(read(other.path(), ".gitignore"), "target/\n# editor\n*.swp\n.scrap/\n");
        }

        it "accepts an equivalent existing entry" {
            let other = tempfile::tempdir().expect("Failed to create temp dir");
            write(other.path(), ".gitignore", "/.scrap\n");

            Scrapyard::open(other.path(), &Config::default()).expect("Failed to open");

            assert_eq!(read(other.path(), ".gitignore"), "/.scrap\n");
        }

        it "leaves .gitignore alone when disabled" {
            let other = tempfile::tempdir().expect("Failed to create temp dir");
            let config = Config { update_gitignore: false, ..Config::default() };

            Scrapyard::open(other.path(), &config).expect("Failed to open");

            assert!(!other.path().join(".gitignore").exists());
        }

        it "uses the configured directory name" {
            let other = tempfile::tempdir().expect("Failed to create temp dir");
            let config = Config { scrap_dir: ".trash".to_string(), ..Config::default() };
            write(other.path(), "junk.txt", "x");

            let custom = Scrapyard::open(other.path(), &config).expect("Failed to open");
            custom.scrap(Path::new("junk.txt")).expect("Failed to scrap");

            assert!(other.path().join(".trash/junk.txt").exists());
            assert_eq!(read(other.path(), ".gitignore"), ".trash/\n");
        }

        it "fails for a missing root" {
            let result = Scrapyard::open(&root.join("nope"), &Config::default());
            assert!(matches!(result, Err(ScrapError::NotFound(_))));
        }
    }

    describe "open_read_only" {
        it "creates nothing in a fresh root" {
            let other = tempfile::tempdir().expect("Failed to create temp dir");

            let reader = Scrapyard::open_read_only(other.path(), &Config::default()).expect("Failed to open");
            let status = reader.status().expect("Query failed");

            assert_eq!(status.entries, 0);
            assert!(status.untracked.is_empty());
            assert!(!status.gitignored);
            assert!(!other.path().join(".scrap").exists());
            assert!(!other.path().join(".gitignore").exists());
        }

        it "sees items scrapped earlier" {
            write(&root, "a.txt", "a");
            yard.scrap(Path::new("a.txt")).expect("Failed to scrap");

            let reader = Scrapyard::open_read_only(&root, &Config::default()).expect("Failed to open");

            assert_eq!(reader.list().expect("Query failed").len(), 1);
        }
    }

    describe "scrap" {
        it "moves a file into the scrap directory" {
            write(&root, "notes.txt", "hello");

            let entry = yard.scrap(Path::new("notes.txt")).expect("Failed to scrap");

            assert!(!root.join("notes.txt").exists());
            assert_eq!(read(&root, ".scrap/notes.txt"), "hello");
            assert_eq!(entry.name, "notes.txt");
            assert_eq!(entry.original_path, "notes.txt");
            assert_eq!(entry.kind, EntryKind::File);
            assert_eq!(entry.size_bytes, 5);
        }

        it "moves a directory with its contents" {
            write(&root, "build/out/app.js", "js");
            write(&root, "build/index.html", "<html>");

            let entry = yard.scrap(Path::new("build")).expect("Failed to scrap");

            assert!(!root.join("build").exists());
            assert_eq!(read(&root, ".scrap/build/out/app.js"), "js");
            assert_eq!(read(&root, ".scrap/build/index.html"), "<html>");
            assert_eq!(entry.kind, EntryKind::Dir);
            assert_eq!(entry.size_bytes, 8);
        }

        it "accepts absolute paths" {
            write(&root, "abs.txt", "a");

            let entry = yard.scrap(&root.join("abs.txt")).expect("Failed to scrap");

            assert_eq!(entry.original_path, "abs.txt");
        }

        it "records nested paths relative to the root" {
            write(&root, "src/old/legacy.rs", "fn main() {}");

            let entry = yard.scrap(Path::new("src/old/legacy.rs")).expect("Failed to scrap");

            assert_eq!(entry.name, "legacy.rs");
            assert_eq!(entry.original_path, Path::new("src/old/legacy.rs").to_string_lossy());
            assert!(root.join("src/old").is_dir());
        }

        it "adds numeric suffixes on name collisions" {
            write(&root, "notes.txt", "first");
            yard.scrap(Path::new("notes.txt")).expect("Failed to scrap");
            write(&root, "notes.txt", "second");
            let second = yard.scrap(Path::new("notes.txt")).expect("Failed to scrap");
            write(&root, "notes.txt", "third");
            let third = yard.scrap(Path::new("notes.txt")).expect("Failed to scrap");

            assert_eq!(second.name, "notes_1.txt");
            assert_eq!(third.name, "notes_2.txt");
            assert_eq!(read(&root, ".scrap/notes.txt"), "first");
            assert_eq!(read(&root, ".scrap/notes_1.txt"), "second");
            assert_eq!(read(&root, ".scrap/notes_2.txt"), "third");
        }

        it "dedups files with the same name from different directories" {
            write(&root, "a/config.toml", "a");
            write(&root, "b/config.toml", "b");

            yard.scrap(Path::new("a/config.toml")).expect("Failed to scrap");
            let second = yard.scrap(Path::new("b/config.toml")).expect("Failed to scrap");

            assert_eq!(second.name, "config_1.toml");
            assert_eq!(read(&root, ".scrap/config_1.toml"), "b");
        }

        it "adds suffixes to colliding directories" {
            fs::create_dir_all(root.join("dist")).expect("Failed to create dir");
            yard.scrap(Path::new("dist")).expect("Failed to scrap");
            fs::create_dir_all(root.join("dist")).expect("Failed to create dir");

            let second = yard.scrap(Path::new("dist")).expect("Failed to scrap");

            assert_eq!(second.name, "dist_1");
        }

        it "skips names the index still holds after the file was deleted by hand" {
            write(&root, "notes.txt", "first");
            yard.scrap(Path::new("notes.txt")).expect("Failed to scrap");
            fs::remove_file(root.join(".scrap/notes.txt")).expect("Failed to remove");
            write(&root, "notes.txt", "second");

            let entry = yard.scrap(Path::new("notes.txt")).expect("Failed to scrap");

            assert_eq!(entry.name, "notes_1.txt");
            assert_eq!(read(&root, ".scrap/notes_1.txt"), "second");
            assert!(!root.join("notes.txt").exists());
            assert_eq!(yard.list().expect("Query failed").len(), 2);
        }

        it "fails for a path that does not exist" {
            let result = yard.scrap(Path::new("missing.txt"));
            assert!(matches!(result, Err(ScrapError::NotFound(_))));
        }

        it "refuses the scrap directory and its contents" {
            write(&root, "notes.txt", "x");
            yard.scrap(Path::new("notes.txt")).expect("Failed to scrap");

            assert!(matches!(yard.scrap(Path::new(".scrap")), Err(ScrapError::InsideScrap(_))));
            assert!(matches!(
                yard.scrap(Path::new(".scrap/notes.txt")),
                Err(ScrapError::InsideScrap(_))
            ));
        }

        it "refuses the working root" {
            assert!(matches!(yard.scrap(Path::new(".")), Err(ScrapError::IsRoot(_))));
        }

        it "continues past failures when scrapping many paths" {
            write(&root, "a.txt", "a");
            write(&root, "c.txt", "c");

            let results = yard.scrap_many(&["a.txt", "b.txt", "c.txt"]);

            assert_eq!(results.len(), 3);
            assert!(results[0].1.is_ok());
            assert!(matches!(results[1].1, Err(ScrapError::NotFound(_))));
            assert!(results[2].1.is_ok());
            assert_eq!(yard.list().expect("Query failed").len(), 2);
        }
    }

    describe "list" {
        it "returns empty list when nothing was scrapped" {
            assert!(yard.list().expect("Query failed").is_empty());
        }

        it "returns entries oldest first" {
            write(&root, "one.txt", "1");
            write(&root, "two.txt", "2");
            yard.scrap(Path::new("one.txt")).expect("Failed to scrap");
            yard.scrap(Path::new("two.txt")).expect("Failed to scrap");

            let names: Vec<String> = yard.list().expect("Query failed").into_iter().map(|e| e.name).collect();
            assert_eq!(names, vec!["one.txt", "two.txt"]);
        }

        it "survives reopening" {
            write(&root, "keep.txt", "k");
            yard.scrap(Path::new("keep.txt")).expect("Failed to scrap");
            drop(yard);

            let reopened = Scrapyard::open(&root, &Config::default()).expect("Failed to reopen");
            assert_eq!(reopened.list().expect("Query failed").len(), 1);
        }

        it "reports items the index does not know about" {
            write(&root, ".scrap/dropped-by-hand.txt", "x");
            write(&root, "tracked.txt", "t");
            yard.scrap(Path::new("tracked.txt")).expect("Failed to scrap");

            assert_eq!(yard.untracked().expect("Query failed"), vec!["dropped-by-hand.txt"]);
        }
    }

    describe "find" {
        before {
            write(&root, "docs/Design.md", "d");
            write(&root, "src/main.rs", "m");
            yard.scrap(Path::new("docs/Design.md")).expect("Failed to scrap");
            yard.scrap(Path::new("src/main.rs")).expect("Failed to scrap");
        }

        it "matches names case-insensitively" {
            let found = yard.find("design").expect("Query failed");
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].name, "Design.md");
        }

        it "matches original paths" {
            let found = yard.find("src").expect("Query failed");
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].name, "main.rs");
        }

        it "treats wildcards literally" {
            assert!(yard.find("%").expect("Query failed").is_empty());
            assert!(yard.find("_").expect("Query failed").is_empty());
        }
    }

    describe "restore" {
        it "moves the item back to where it came from" {
            write(&root, "src/lib.rs", "lib");
            yard.scrap(Path::new("src/lib.rs")).expect("Failed to scrap");

            yard.restore("lib.rs", None, false).expect("Failed to restore");

            assert_eq!(read(&root, "src/lib.rs"), "lib");
            assert!(!root.join(".scrap/lib.rs").exists());
            assert!(yard.list().expect("Query failed").is_empty());
        }

        it "recreates missing parent directories" {
            write(&root, "deep/nested/file.txt", "f");
            yard.scrap(Path::new("deep/nested/file.txt")).expect("Failed to scrap");
            fs::remove_dir_all(root.join("deep")).expect("Failed to remove");

            yard.restore("file.txt", None, false).expect("Failed to restore");

            assert_eq!(read(&root, "deep/nested/file.txt"), "f");
        }

        it "restores a suffixed item to its original name" {
            write(&root, "notes.txt", "first");
            yard.scrap(Path::new("notes.txt")).expect("Failed to scrap");
            write(&root, "notes.txt", "second");
            yard.scrap(Path::new("notes.txt")).expect("Failed to scrap");

            yard.restore("notes_1.txt", None, false).expect("Failed to restore");

            assert_eq!(read(&root, "notes.txt"), "second");
        }

        it "refuses to overwrite an existing file" {
            write(&root, "notes.txt", "old");
            yard.scrap(Path::new("notes.txt")).expect("Failed to scrap");
            write(&root, "notes.txt", "new");

            let result = yard.restore("notes.txt", None, false);

            assert!(matches!(result, Err(ScrapError::DestinationExists(_))));
            assert_eq!(read(&root, "notes.txt"), "new");
            assert_eq!(yard.list().expect("Query failed").len(), 1);
        }

        it "overwrites with force" {
            write(&root, "notes.txt", "old");
            yard.scrap(Path::new("notes.txt")).expect("Failed to scrap");
            write(&root, "notes.txt", "new");

            yard.restore("notes.txt", None, true).expect("Failed to restore");

            assert_eq!(read(&root, "notes.txt"), "old");
        }

        it "restores to another location" {
            write(&root, "notes.txt", "n");
            yard.scrap(Path::new("notes.txt")).expect("Failed to scrap");

            yard.restore("notes.txt", Some(Path::new("archive/notes.md")), false).expect("Failed to restore");

            assert_eq!(read(&root, "archive/notes.md"), "n");
            assert!(!root.join("notes.txt").exists());
        }

        it "never replaces the working root, even with force" {
            write(&root, "a.txt", "a");
            yard.scrap(Path::new("a.txt")).expect("Failed to scrap");

            let result = yard.restore("a.txt", Some(Path::new(".")), true);

            assert!(matches!(result, Err(ScrapError::IsRoot(_))));
            assert_eq!(read(&root, ".scrap/a.txt"), "a");
            assert_eq!(yard.list().expect("Query failed").len(), 1);
        }

        it "never replaces an ancestor of the working root" {
            write(&root, "a.txt", "a");
            yard.scrap(Path::new("a.txt")).expect("Failed to scrap");

            let result = yard.restore("a.txt", Some(Path::new("sub/../..")), true);

            assert!(matches!(result, Err(ScrapError::IsRoot(_))));
            assert!(root.is_dir());
            assert_eq!(read(&root, ".scrap/a.txt"), "a");
        }

        it "refuses targets inside the scrap directory" {
            write(&root, "a.txt", "a");
            yard.scrap(Path::new("a.txt")).expect("Failed to scrap");

            for target in [".scrap", ".scrap/a.txt", ".scrap/elsewhere.txt"] {
                let result = yard.restore("a.txt", Some(Path::new(target)), true);
                assert!(matches!(result, Err(ScrapError::InsideScrap(_))), "{}", target);
            }
            assert_eq!(read(&root, ".scrap/a.txt"), "a");
            assert!(root.join(".scrap/.index.db").exists());
            assert_eq!(yard.list().expect("Query failed").len(), 1);
        }

        it "fails for an unknown name" {
            let result = yard.restore("ghost.txt", None, false);
            assert!(matches!(result, Err(ScrapError::EntryNotFound(_))));
        }
    }

    describe "purge" {
        it "deletes the item permanently" {
            write(&root, "big.log", "xxxx");
            yard.scrap(Path::new("big.log")).expect("Failed to scrap");

            let entry = yard.purge("big.log").expect("Failed to purge");

            assert_eq!(entry.name, "big.log");
            assert!(!root.join(".scrap/big.log").exists());
            assert!(yard.list().expect("Query failed").is_empty());
        }

        it "drops the entry even if the item was already removed by hand" {
            write(&root, "gone.txt", "g");
            yard.scrap(Path::new("gone.txt")).expect("Failed to scrap");
            fs::remove_file(root.join(".scrap/gone.txt")).expect("Failed to remove");

            yard.purge("gone.txt").expect("Failed to purge");

            assert!(yard.list().expect("Query failed").is_empty());
        }

        it "fails for an unknown name" {
            assert!(matches!(yard.purge("ghost"), Err(ScrapError::EntryNotFound(_))));
        }
    }

    describe "clean" {
        it "removes items scrapped before the cutoff" {
            write(&root, "old.txt", "o");
            yard.scrap(Path::new("old.txt")).expect("Failed to scrap");

            let removed = yard.clean_before(Utc::now() + Duration::seconds(1)).expect("Failed to clean");

            assert_eq!(removed.len(), 1);
            assert!(!root.join(".scrap/old.txt").exists());
        }

        it "keeps recent items" {
            write(&root, "fresh.txt", "f");
            yard.scrap(Path::new("fresh.txt")).expect("Failed to scrap");

            let removed = yard.clean(Duration::days(30)).expect("Failed to clean");

            assert!(removed.is_empty());
            assert!(root.join(".scrap/fresh.txt").exists());
        }

        it "keeps everything when the age reaches past the earliest date" {
            write(&root, "fresh.txt", "f");
            yard.scrap(Path::new("fresh.txt")).expect("Failed to scrap");

            let removed = yard.clean(Duration::days(u32::MAX as i64)).expect("Failed to clean");

            assert!(removed.is_empty());
            assert!(root.join(".scrap/fresh.txt").exists());
        }
    }

    describe "empty" {
        it "removes tracked and untracked items but keeps the index" {
            write(&root, "a.txt", "a");
            yard.scrap(Path::new("a.txt")).expect("Failed to scrap");
            write(&root, ".scrap/stray", "s");

            let count = yard.empty().expect("Failed to empty");

            assert_eq!(count, 2);
            assert!(yard.list().expect("Query failed").is_empty());
            assert!(yard.untracked().expect("Query failed").is_empty());
            assert!(root.join(".scrap/.index.db").exists());
        }
    }

    describe "history" {
        it "records events most recent first" {
            write(&root, "a.txt", "a");
            yard.scrap(Path::new("a.txt")).expect("Failed to scrap");
            yard.restore("a.txt", None, false).expect("Failed to restore");
            yard.scrap(Path::new("a.txt")).expect("Failed to scrap");
            yard.purge("a.txt").expect("Failed to purge");

            let actions: Vec<HistoryAction> = yard
                .history(None)
                .expect("Query failed")
                .into_iter()
                .map(|e| e.action)
                .collect();

            assert_eq!(
                actions,
                vec![
                    HistoryAction::Purged,
                    HistoryAction::Scrapped,
                    HistoryAction::Restored,
                    HistoryAction::Scrapped,
                ]
            );
        }

        it "honours the limit" {
            write(&root, "a.txt", "a");
            write(&root, "b.txt", "b");
            yard.scrap(Path::new("a.txt")).expect("Failed to scrap");
            yard.scrap(Path::new("b.txt")).expect("Failed to scrap");

            let events = yard.history(Some(1)).expect("Query failed");

            assert_eq!(events.len(), 1);
            assert_eq!(events[0].name, "b.txt");
        }
    }

    describe "status" {
        it "summarizes the scrap directory" {
            write(&root, "a.txt", "12345");
            yard.scrap(Path::new("a.txt")).expect("Failed to scrap");
            write(&root, ".scrap/stray", "s");

            let status = yard.status().expect("Query failed");

            assert_eq!(status.entries, 1);
            assert_eq!(status.total_bytes, 5);
            assert_eq!(status.untracked, vec!["stray"]);
            assert!(status.gitignored);
        }
    }
}
