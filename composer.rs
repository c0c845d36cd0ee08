//! Scene composition
//!
//! Owns one fountain per category, places them evenly on a circle in label
//! order, and routes the latest cumulative counts to them. A category that
//! vanishes from the feed takes its fountain (timer and feed entry included)
//! with it; a quiet category merely goes dormant.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::f32::consts::PI;

use log::{debug, warn};

use crate::emitter::{make_label, Emitter, Label, ReleaseSink, Snapshot};
use crate::error::{Error, Result};
use crate::settings::{Settings, DEFAULT_POOL_SIZE};

/// Keep only what follows the last hyphen of a layer name.
pub fn shorten_label(name: &str) -> &str {
    name.rsplit('-').next().unwrap_or(name).trim()
}

/// Slot `index` of `count` evenly spaced points on a circle, rounded to
/// whole units.
pub fn circle_slot(index: usize, count: usize, radius: f32) -> [f32; 2] {
    let segment = (PI * 2.0) / count.max(1) as f32;
    let angle = segment * index as f32;
    [
        libm::roundf(radius * libm::cosf(angle)),
        libm::roundf(radius * libm::sinf(angle)),
    ]
}

pub struct Packscape<S = (), const N: usize = DEFAULT_POOL_SIZE> {
    settings: Settings,
    sink: S,
    emitters: BTreeMap<Label, Box<Emitter<N>>>,
    latest: BTreeMap<Label, u64>,
}

impl<S: ReleaseSink, const N: usize> Packscape<S, N> {
    pub fn new(settings: Settings, sink: S) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            sink,
            emitters: BTreeMap::new(),
            latest: BTreeMap::new(),
        })
    }

    /// Replace the category set with a full snapshot of cumulative counts.
    ///
    /// Names are shortened first; names that collide afterwards keep the
    /// last value seen. Counts are only buffered here and reach the
    /// fountains on the next tick.
    pub fn ingest<'a, I>(&mut self, counts: I, now: u64) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let mut latest = BTreeMap::new();
        for (name, count) in counts {
            match make_label(shorten_label(name)) {
                Ok(label) => {
                    latest.insert(label, count);
                }
                Err(err) => warn!("skipping layer {:?}: {}", name, err),
            }
        }

        self.emitters.retain(|label, emitter| {
            let keep = latest.contains_key(label);
            if !keep {
                emitter.retire();
                debug!("layer {} left the feed", label);
            }
            keep
        });

        let count = latest.len();
        for (index, label) in latest.keys().enumerate() {
            if self.emitters.contains_key(label) {
                continue;
            }
            let target = self.slot(index, count)?;
            let emitter = Emitter::new(label.clone(), target, self.settings, now)?;
            self.emitters.insert(label.clone(), Box::new(emitter));
        }

        self.latest = latest;
        Ok(())
    }

    fn slot(&self, index: usize, count: usize) -> Result<[f32; 2]> {
        let target = circle_slot(index, count, self.settings.circle_radius);
        if target.iter().all(|c| c.is_finite()) {
            Ok(target)
        } else {
            Err(Error::NonFiniteTarget)
        }
    }

    /// Drive every fountain one frame.
    pub fn tick(&mut self, now: u64) -> Result<()> {
        let count = self.emitters.len();
        let targets = (0..count)
            .map(|index| self.slot(index, count))
            .collect::<Result<Vec<_>>>()?;

        for ((label, emitter), target) in self.emitters.iter_mut().zip(targets) {
            let latest = self.latest.get(label).copied();
            emitter.tick(now, target, latest, &mut self.sink)?;
        }
        Ok(())
    }

    /// Frame views in label order.
    pub fn snapshots(&self) -> impl Iterator<Item = Snapshot<'_>> {
        self.emitters.values().map(|emitter| emitter.snapshot())
    }

    pub fn emitter(&self, name: &str) -> Option<&Emitter<N>> {
        let label = make_label(name).ok()?;
        self.emitters.get(&label).map(|emitter| &**emitter)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.emitters.keys().map(|label| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn update_settings(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;
        for emitter in self.emitters.values_mut() {
            emitter.update_settings(settings);
        }
        self.settings = settings;
        Ok(())
    }
}
