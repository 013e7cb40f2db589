//! Audio file resolution and weighted selection
//!
//! Candidates are resolved against the sounds directory and filtered for
//! existence before selection. Selection preserves the behavior existing
//! configuration files depend on: once any sibling entry carries a positive
//! weight, unweighted entries are only reachable through the uniform
//! fallback (see DESIGN.md).

use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{debug, warn};

use sslcast_common::config::AudioFileEntry;

/// A playable candidate: resolved path plus validated weight
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub path: PathBuf,
    /// Positive weight if one was configured; zero and negative weights
    /// count as unweighted
    pub weight: Option<f64>,
}

/// Resolve config entries against the sounds directory, dropping files
/// that do not exist on disk
pub fn resolve_candidates(sounds_dir: &Path, files: &[AudioFileEntry]) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(files.len());
    for entry in files {
        let path = sounds_dir.join(&entry.path);
        if !path.is_file() {
            warn!("Audio file not found, skipping candidate: {}", path.display());
            continue;
        }
        candidates.push(Candidate {
            path,
            weight: entry.weight.filter(|w| *w > 0.0),
        });
    }
    candidates
}

/// Select one candidate, or `None` when the list is empty.
///
/// - a single candidate is taken as-is;
/// - with no weights anywhere, selection is uniform;
/// - otherwise unweighted entries contribute weight zero; if the weighted
///   total collapses to zero the choice falls back to uniform over all
///   candidates, else it is proportional to weight.
pub fn select_file<R: Rng>(rng: &mut R, candidates: &[Candidate]) -> Option<PathBuf> {
    match candidates.len() {
        0 => None,
        1 => Some(candidates[0].path.clone()),
        _ => {
            if candidates.iter().all(|c| c.weight.is_none()) {
                let index = rng.gen_range(0..candidates.len());
                return Some(candidates[index].path.clone());
            }

            let weights: Vec<f64> = candidates
                .iter()
                .map(|c| c.weight.unwrap_or(0.0))
                .collect();
            let total: f64 = weights.iter().sum();
            if total <= 0.0 {
                debug!("Weighted total collapsed to zero, selecting uniformly");
                let index = rng.gen_range(0..candidates.len());
                return Some(candidates[index].path.clone());
            }

            let mut draw = rng.gen::<f64>() * total;
            for (candidate, weight) in candidates.iter().zip(&weights) {
                draw -= weight;
                if draw < 0.0 {
                    return Some(candidate.path.clone());
                }
            }
            // Floating point edge: fall back to the last weighted candidate
            candidates
                .iter()
                .rev()
                .find(|c| c.weight.is_some())
                .map(|c| c.path.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn candidate(name: &str, weight: Option<f64>) -> Candidate {
        Candidate {
            path: PathBuf::from(name),
            weight,
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5517_CA57)
    }

    #[test]
    fn test_empty_list_selects_nothing() {
        assert_eq!(select_file(&mut rng(), &[]), None);
    }

    #[test]
    fn test_single_candidate_always_selected() {
        let candidates = vec![candidate("only.wav", None)];
        assert_eq!(
            select_file(&mut rng(), &candidates),
            Some(PathBuf::from("only.wav"))
        );
    }

    #[test]
    fn test_weighted_distribution_three_to_one() {
        let candidates = vec![
            candidate("a.wav", Some(3.0)),
            candidate("b.wav", Some(1.0)),
        ];
        let mut rng = rng();
        let mut counts: HashMap<PathBuf, u32> = HashMap::new();
        for _ in 0..10_000 {
            let chosen = select_file(&mut rng, &candidates).unwrap();
            *counts.entry(chosen).or_default() += 1;
        }
        let a = counts[&PathBuf::from("a.wav")] as f64 / 10_000.0;
        // Expect ~75%, generous statistical tolerance
        assert!((a - 0.75).abs() < 0.03, "observed frequency {a}");
    }

    #[test]
    fn test_unweighted_sibling_never_selected_when_weights_present() {
        let candidates = vec![
            candidate("weighted.wav", Some(1.0)),
            candidate("unweighted.wav", None),
        ];
        let mut rng = rng();
        for _ in 0..1_000 {
            assert_eq!(
                select_file(&mut rng, &candidates),
                Some(PathBuf::from("weighted.wav"))
            );
        }
    }

    #[test]
    fn test_all_unweighted_is_roughly_uniform() {
        let candidates = vec![
            candidate("a.wav", None),
            candidate("b.wav", None),
            candidate("c.wav", None),
        ];
        let mut rng = rng();
        let mut counts: HashMap<PathBuf, u32> = HashMap::new();
        for _ in 0..9_000 {
            let chosen = select_file(&mut rng, &candidates).unwrap();
            *counts.entry(chosen).or_default() += 1;
        }
        for count in counts.values() {
            let freq = *count as f64 / 9_000.0;
            assert!((freq - 1.0 / 3.0).abs() < 0.03, "observed frequency {freq}");
        }
    }

    #[test]
    fn test_zero_weights_collapse_to_uniform() {
        // Zero/negative weights are invalid, so no candidate carries a
        // weight and selection is uniform over all of them
        let resolved = vec![
            candidate("a.wav", Some(0.0).filter(|w| *w > 0.0)),
            candidate("b.wav", None),
        ];
        let mut rng = rng();
        let mut saw_b = false;
        for _ in 0..200 {
            if select_file(&mut rng, &resolved) == Some(PathBuf::from("b.wav")) {
                saw_b = true;
                break;
            }
        }
        assert!(saw_b);
    }

    #[test]
    fn test_resolve_filters_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("present.wav"), b"riff").unwrap();
        let entries = vec![
            AudioFileEntry {
                path: "present.wav".into(),
                weight: Some(2.0),
            },
            AudioFileEntry {
                path: "missing.wav".into(),
                weight: None,
            },
        ];
        let candidates = resolve_candidates(dir.path(), &entries);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].path, dir.path().join("present.wav"));
        assert_eq!(candidates[0].weight, Some(2.0));
    }

    #[test]
    fn test_resolve_drops_nonpositive_weights() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.wav"), b"riff").unwrap();
        let entries = vec![AudioFileEntry {
            path: "a.wav".into(),
            weight: Some(-1.0),
        }];
        let candidates = resolve_candidates(dir.path(), &entries);
        assert_eq!(candidates[0].weight, None);
    }
}
