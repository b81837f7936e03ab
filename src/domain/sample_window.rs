//! Adaptive area window around a target floor area.
//!
//! Each offer type widens its own symmetric window
//! `[target * (1 - w), target * (1 + w)]` until it holds enough comparables
//! or the step budget runs out. Sale and rental liquidity differ, so the two
//! sides lock independently.

use crate::domain::filter::ListingFilter;
use crate::domain::listing::{Listing, OfferType};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowParams {
    pub initial_width: f64,
    pub step: f64,
    /// Number of widenings tried after the initial width.
    pub max_steps: usize,
    pub min_sample: usize,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            initial_width: 0.10,
            step: 0.05,
            max_steps: 17,
            min_sample: 9,
        }
    }
}

impl WindowParams {
    pub fn width_at(&self, step: usize) -> f64 {
        self.initial_width + self.step * step as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedWindow {
    pub width: f64,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    /// False when the step budget ran out before `min_sample` was met.
    pub reached_min_sample: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowResolution {
    pub target_area: Option<f64>,
    pub sale: Option<ResolvedWindow>,
    pub rental: Option<ResolvedWindow>,
}

impl WindowResolution {
    pub fn for_offer(&self, offer: OfferType) -> Option<&ResolvedWindow> {
        match offer {
            OfferType::Sale => self.sale.as_ref(),
            OfferType::Rental => self.rental.as_ref(),
        }
    }
}

pub fn window_bounds(target: f64, width: f64) -> (f64, f64) {
    (target * (1.0 - width), target * (1.0 + width))
}

pub fn in_window(area: f64, target: f64, width: f64) -> bool {
    let (lower, upper) = window_bounds(target, width);
    area >= lower && area <= upper
}

/// Narrowest width holding at least `params.min_sample` rows.
///
/// `rows` must already satisfy every other predicate of the request.
pub fn resolve_window<T, A>(rows: &[T], area_of: A, target: f64, params: &WindowParams) -> ResolvedWindow
where
    A: Fn(&T) -> f64,
{
    let count_at = |width: f64| rows.iter().filter(|r| in_window(area_of(r), target, width)).count();

    let mut last = None;
    for step in 0..=params.max_steps {
        let width = params.width_at(step);
        let count = count_at(width);
        let (lower, upper) = window_bounds(target, width);
        let window = ResolvedWindow {
            width,
            lower,
            upper,
            count,
            reached_min_sample: count >= params.min_sample,
        };
        if window.reached_min_sample {
            return window;
        }
        last = Some(window);
    }

    last.unwrap_or_else(|| {
        let width = params.initial_width;
        let (lower, upper) = window_bounds(target, width);
        ResolvedWindow {
            width,
            lower,
            upper,
            count: count_at(width),
            reached_min_sample: false,
        }
    })
}

/// Per-offer-type subsets after every predicate, including the area window.
#[derive(Debug, Default)]
pub struct Segments<'l> {
    pub sale: Vec<&'l Listing>,
    pub rental: Vec<&'l Listing>,
    pub resolution: WindowResolution,
}

impl<'l> Segments<'l> {
    pub fn get(&self, offer: OfferType) -> &[&'l Listing] {
        match offer {
            OfferType::Sale => &self.sale,
            OfferType::Rental => &self.rental,
        }
    }
}

pub fn resolve_segments<'l>(
    listings: &'l [Listing],
    filter: &ListingFilter<'_>,
    params: &WindowParams,
) -> Segments<'l> {
    let target = filter.spec().target_area;
    let mut segments = Segments {
        resolution: WindowResolution {
            target_area: target,
            ..Default::default()
        },
        ..Default::default()
    };

    for offer in OfferType::ALL {
        let candidates = filter.apply_offer(listings, offer);
        let (rows, window) = match target {
            Some(target) => {
                let window = resolve_window(&candidates, |l| l.usable_area, target, params);
                let rows = candidates
                    .into_iter()
                    .filter(|l| in_window(l.usable_area, target, window.width))
                    .collect();
                (rows, Some(window))
            }
            None => (candidates, None),
        };

        if let Some(w) = window {
            tracing::debug!(
                offer = %offer,
                width = w.width,
                count = w.count,
                reached = w.reached_min_sample,
                "resolved area window"
            );
        }

        match offer {
            OfferType::Sale => {
                segments.sale = rows;
                segments.resolution.sale = window;
            }
            OfferType::Rental => {
                segments.rental = rows;
                segments.resolution.rental = window;
            }
        }
    }

    segments
}
