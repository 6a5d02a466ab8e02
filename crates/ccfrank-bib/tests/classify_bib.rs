//! End-to-end: parse a `.bib` file and rank its entries against the bundled
//! reference table.

use ccfrank_bib::parse_bib_file;
use ccfrank_core::{Classification, Classifier, Matcher, OverrideStore, Rank, ReferenceIndex};

const SAMPLE: &str = r#"
@inproceedings{cvpr2024,
  title={Learning to See in the Dark Again},
  booktitle={Proceedings of the 2024 IEEE/CVF Conference on Computer Vision and Pattern Recognition},
  year={2024}
}

@article{tse2021,
  title={Refactoring at Scale},
  journal={IEEE Transactions on Software Engineering},
  year={2021}
}

@misc{aaai2021,
  title={Some Paper Title (AAAI'21)},
  year={2021}
}

@misc{preprint,
  title={An Unranked Preprint},
  howpublished={arXiv}
}
"#;

#[test]
fn sample_file_is_ranked() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refs.bib");
    std::fs::write(&path, SAMPLE).unwrap();

    let parsed = parse_bib_file(&path).unwrap();
    assert_eq!(parsed.entries.len(), 4);

    let index = ReferenceIndex::bundled().unwrap();
    let mut store = OverrideStore::in_memory();
    store.ignore_item(4);

    let classifier = Classifier::new(Matcher::new(&index), &store);
    let ranks: Vec<_> = parsed
        .entries
        .iter()
        .map(|e| classifier.rank_for_record(e.id, e))
        .collect();
    assert_eq!(ranks, vec!["A", "A", "A", ""]);

    match classifier.classify(3, &parsed.entries[2]) {
        Classification::Matched(m) => assert_eq!(m.venue.entry.abbreviation, "AAAI"),
        other => panic!("expected a match, got {other:?}"),
    }
    assert_eq!(classifier.classify(3, &parsed.entries[2]).rank(), Some(Rank::A));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = parse_bib_file(&dir.path().join("absent.bib"));
    assert!(matches!(result, Err(ccfrank_bib::BibError::Io(_))));
}
