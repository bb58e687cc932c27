/// IoU-association multi-object tracker.
///
/// Two presets share one implementation. `ByteTrack` matches
/// high-confidence detections first, then lets low-confidence detections
/// fill remaining unmatched tracks, which keeps existing tracks alive
/// through momentary confidence drops without spawning spurious ones.
/// `Greedy` runs a single matching pass over all detections.
use std::collections::HashSet;

use crate::shared::constants::TRACKER_MAX_LOST;
use crate::shared::detection::{BoundingBox, Detection};

const HIGH_THRESH: f64 = 0.5;
const MATCH_THRESH: f64 = 0.3;

/// Association strategy preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrackerVariant {
    #[default]
    ByteTrack,
    Greedy,
}

#[derive(Clone, Debug)]
pub struct Track {
    pub id: u32,
    pub bbox: BoundingBox,
    /// Index into the detection slice this track matched in the last update.
    pub det_index: Option<usize>,
}

#[derive(Clone, Debug)]
struct TrackState {
    id: u32,
    bbox: BoundingBox,
    class_id: usize,
    frames_lost: usize,
    matched: bool,
    det_index: Option<usize>,
}

pub struct IouTracker {
    variant: TrackerVariant,
    tracks: Vec<TrackState>,
    next_id: u32,
    max_lost: usize,
}

impl IouTracker {
    pub fn new(variant: TrackerVariant) -> Self {
        Self::with_max_lost(variant, TRACKER_MAX_LOST)
    }

    pub fn with_max_lost(variant: TrackerVariant, max_lost: usize) -> Self {
        Self {
            variant,
            tracks: Vec::new(),
            next_id: 1,
            max_lost,
        }
    }

    pub fn update(&mut self, detections: &[Detection]) -> Vec<Track> {
        let (first_pass, second_pass) = match self.variant {
            TrackerVariant::ByteTrack => split_by_confidence(detections),
            TrackerVariant::Greedy => (detections.iter().enumerate().collect(), Vec::new()),
        };

        self.reset_match_flags();
        let num_existing = self.tracks.len();
        let matched_first = self.match_first_pass(&first_pass, detections);
        self.match_second_pass(&second_pass, detections);
        self.create_new_tracks(&first_pass, &matched_first, detections);
        self.age_unmatched_tracks(num_existing);

        self.active_tracks()
    }

    fn reset_match_flags(&mut self) {
        for track in &mut self.tracks {
            track.matched = false;
            track.det_index = None;
        }
    }

    fn match_first_pass(
        &mut self,
        dets: &[(usize, &Detection)],
        detections: &[Detection],
    ) -> HashSet<usize> {
        let track_refs: Vec<(usize, BoundingBox, usize)> = self
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (i, t.bbox, t.class_id))
            .collect();

        let mut matched_det_indices = HashSet::new();
        for (ti, di) in greedy_match(&track_refs, dets, MATCH_THRESH) {
            self.apply_match(ti, di, &detections[di]);
            matched_det_indices.insert(di);
        }
        matched_det_indices
    }

    fn match_second_pass(&mut self, dets: &[(usize, &Detection)], detections: &[Detection]) {
        let unmatched_refs: Vec<(usize, BoundingBox, usize)> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.matched)
            .map(|(i, t)| (i, t.bbox, t.class_id))
            .collect();

        for (ti, di) in greedy_match(&unmatched_refs, dets, MATCH_THRESH) {
            self.apply_match(ti, di, &detections[di]);
        }
    }

    fn apply_match(&mut self, track_idx: usize, det_idx: usize, detection: &Detection) {
        self.tracks[track_idx].bbox = detection.bbox;
        self.tracks[track_idx].frames_lost = 0;
        self.tracks[track_idx].matched = true;
        self.tracks[track_idx].det_index = Some(det_idx);
    }

    fn create_new_tracks(
        &mut self,
        dets: &[(usize, &Detection)],
        matched: &HashSet<usize>,
        detections: &[Detection],
    ) {
        for (di, det) in dets {
            let eligible = match self.variant {
                TrackerVariant::ByteTrack => true,
                TrackerVariant::Greedy => det.score >= HIGH_THRESH,
            };
            if eligible && !matched.contains(di) {
                self.tracks.push(TrackState {
                    id: self.next_id,
                    bbox: detections[*di].bbox,
                    class_id: detections[*di].class_id,
                    frames_lost: 0,
                    matched: true,
                    det_index: Some(*di),
                });
                self.next_id += 1;
            }
        }
    }

    fn age_unmatched_tracks(&mut self, num_existing: usize) {
        for track in self.tracks.iter_mut().take(num_existing) {
            if !track.matched {
                track.frames_lost += 1;
            }
        }
        let max_lost = self.max_lost;
        self.tracks.retain(|t| t.frames_lost <= max_lost);
    }

    /// Only matched tracks produce output; lost tracks are kept internally
    /// for re-identification but carry no detection this frame.
    fn active_tracks(&self) -> Vec<Track> {
        self.tracks
            .iter()
            .filter(|t| t.matched)
            .map(|t| Track {
                id: t.id,
                bbox: t.bbox,
                det_index: t.det_index,
            })
            .collect()
    }
}

type IndexedDets<'a> = Vec<(usize, &'a Detection)>;

fn split_by_confidence(detections: &[Detection]) -> (IndexedDets<'_>, IndexedDets<'_>) {
    let mut high = Vec::new();
    let mut low = Vec::new();
    for (i, det) in detections.iter().enumerate() {
        if det.score >= HIGH_THRESH {
            high.push((i, det));
        } else {
            low.push((i, det));
        }
    }
    (high, low)
}

/// Greedy IoU matching: pairs sorted by descending IoU, each track and
/// detection used at most once. Tracks never switch class.
fn greedy_match(
    tracks: &[(usize, BoundingBox, usize)],
    dets: &[(usize, &Detection)],
    thresh: f64,
) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (ti, bbox, class_id) in tracks {
        for (di, det) in dets {
            if det.class_id != *class_id {
                continue;
            }
            let score = bbox.iou(&det.bbox);
            if score >= thresh {
                pairs.push((*ti, *di, score));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut used_tracks = HashSet::new();
    let mut used_dets = HashSet::new();
    let mut matches = Vec::new();

    for (ti, di, _) in &pairs {
        if !used_tracks.contains(ti) && !used_dets.contains(di) {
            used_tracks.insert(*ti);
            used_dets.insert(*di);
            matches.push((*ti, *di));
        }
    }
    matches
}
