/// End-to-end integration tests for the lexnote pipeline.
///
/// Tests the complete flow:
///   Config → Registry → Search → Render → Notebook (file + sqlite)
use lexnote::config::{Config, NotebookBackend};
use lexnote::dict::markup::{self, Style};
use lexnote::dict::{Dict, DictError, DictRegistry, Endpoint, WordDefine, WordItem};
use lexnote::notebook::{self, Action, Ranking};
use std::fs;
use tempfile::tempdir;

struct FixtureDict;

impl Dict for FixtureDict {
    fn search(&self, word: &str) -> Result<WordItem, DictError> {
        if word == "take off" {
            return Ok(WordItem::new(
                word,
                vec![WordDefine {
                    phonetics: vec![],
                    definition: "++++phrasal verb\n1. 起飞\n----The plane took off.".into(),
                }],
            ));
        }
        Ok(WordItem::not_found(word))
    }
}

fn fixture_factory(_: &lexnote::config::DictConfig) -> Result<Box<dyn Dict>, DictError> {
    Ok(Box::new(FixtureDict))
}

fn config_in(dir: &std::path::Path, backend: NotebookBackend) -> Config {
    let mut config = Config::default();
    config.notebook.backend = backend;
    config.notebook.dir = dir.join("notebook").to_string_lossy().to_string();
    config.notebook.db_path = dir.join("notebook.db").to_string_lossy().to_string();
    config
}

/// Full pipeline: lookup → render → mark → list → review → delete
#[test]
fn test_lookup_and_note_pipeline() {
    let temp_dir = tempdir().unwrap();

    for backend in [NotebookBackend::File, NotebookBackend::Sqlite] {
        let config = config_in(temp_dir.path(), backend);
        config.validate().unwrap();

        // 1. Registry dispatch
        let mut registry = DictRegistry::new();
        registry.register(Endpoint::Youdao, fixture_factory);
        let dict = registry.create(config.endpoint().unwrap(), &config.dict).unwrap();

        // 2. Search and render
        let item = dict.search("take off").unwrap();
        assert!(item.is_found());
        assert_eq!(
            item.raw_string(),
            "take off\nphrasal verb\n1. 起飞\nThe plane took off.\n"
        );
        assert!(!dict.search("qwxz").unwrap().is_found());

        // 3. Mark twice with a fixed clock
        let nb = notebook::open_notebook(&config.notebook).unwrap();
        nb.mark_at(&item.word, Action::Learning, 1000).unwrap();
        let note = nb.mark_at(&item.word, Action::Learning, 2000).unwrap().unwrap();
        assert_eq!(note.lookup_times, 2, "{backend:?}");
        assert_eq!(note.create_time, 1000, "{backend:?}");
        assert_eq!(note.last_lookup_time, 2000, "{backend:?}");

        // 4. List and review
        nb.mark_at("runway", Action::Learning, 3000).unwrap();
        let words: Vec<_> = nb.list_notes().unwrap().into_iter().map(|n| n.word).collect();
        assert_eq!(words, vec!["runway", "take off"], "{backend:?}");
        assert_eq!(nb.review().unwrap().unwrap().word, "runway");

        // 5. Delete
        nb.mark_at("runway", Action::Delete, 4000).unwrap();
        assert_eq!(nb.list_notes().unwrap().len(), 1);
        assert!(nb.mark_at("runway", Action::Delete, 5000).unwrap().is_none());
    }
}

/// Both backends agree on ranking and chapter listing for the same history.
#[test]
fn test_backends_agree() {
    let temp_dir = tempdir().unwrap();
    let history = [
        ("default", "alpha", Action::Learning, 100),
        ("default", "beta", Action::Learning, 200),
        ("default", "alpha", Action::Learning, 300),
        ("default", "gamma", Action::Learned, 400),
        ("travel", "passport", Action::Learning, 500),
    ];

    let mut results = Vec::new();
    for backend in [NotebookBackend::File, NotebookBackend::Sqlite] {
        let mut config = config_in(temp_dir.path(), backend);
        config.notebook.ranking = Ranking::LookupTimesDesc;

        for (chapter, word, action, now) in history {
            config.notebook.chapter = chapter.to_string();
            notebook::open_notebook(&config.notebook)
                .unwrap()
                .mark_at(word, action, now)
                .unwrap();
        }

        config.notebook.chapter = "default".to_string();
        let nb = notebook::open_notebook(&config.notebook).unwrap();
        results.push((nb.list_notes().unwrap(), nb.list_chapter().unwrap()));
    }

    assert_eq!(results[0], results[1]);
    let words: Vec<_> = results[0].0.iter().map(|n| n.word.as_str()).collect();
    assert_eq!(words, vec!["alpha", "beta", "gamma"]);
    assert_eq!(results[0].0[2].lookup_times, -1);
    assert_eq!(results[0].1.len(), 2);
}

/// Config saved to disk drives notebook selection on reload.
#[test]
fn test_config_roundtrip_selects_backend() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("config.json");

    let mut config = config_in(temp_dir.path(), NotebookBackend::Sqlite);
    config.notebook.chapter = "travel".into();
    config.save(&path).unwrap();

    let loaded = Config::load(Some(&path)).unwrap();
    assert_eq!(loaded.notebook.backend, NotebookBackend::Sqlite);
    let nb = notebook::open_notebook(&loaded.notebook).unwrap();
    assert_eq!(nb.chapter(), "travel");
    nb.mark_at("visa", Action::Learning, 1).unwrap();
    assert!(temp_dir.path().join("notebook.db").exists());
    assert!(!temp_dir.path().join("notebook").join("travel.yml").exists());
}

/// The file backend leaves a readable YAML file behind.
#[test]
fn test_file_backend_yaml_layout() {
    let temp_dir = tempdir().unwrap();
    let config = config_in(temp_dir.path(), NotebookBackend::File);
    let nb = notebook::open_notebook(&config.notebook).unwrap();
    nb.mark_at("hello", Action::Learning, 1234567890).unwrap();

    let yaml = fs::read_to_string(temp_dir.path().join("notebook").join("default.yml")).unwrap();
    assert!(yaml.contains("word: hello"));
    assert!(yaml.contains("lookup_times: 1"));
    assert!(yaml.contains("create_time: 1234567890"));
}

#[test]
fn test_markup_decode_contract() {
    let lines = markup::decode("++++Bing (n.)\n----heap or pile\nplain line");
    let styles: Vec<_> = lines.iter().map(|l| l.style).collect();
    assert_eq!(styles, vec![Style::Highlight, Style::Quote, Style::Plain]);
    assert_eq!(
        markup::raw_text("++++Bing (n.)\n----heap or pile\nplain line"),
        "Bing (n.)\nheap or pile\nplain line"
    );
}

#[test]
fn test_unknown_endpoint_rejected() {
    let mut config = Config::default();
    config.dict.endpoint = "bing".into();
    assert!(config.validate().is_err());
    let err = DictRegistry::with_defaults()
        .create_by_name("bing", &config.dict)
        .err()
        .unwrap();
    assert!(matches!(err, DictError::InvalidEndpoint(_)));
}
