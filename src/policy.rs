use crate::config::SearchConfig;

/// What the resolver should do after a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchDecision {
    /// Re-issue the lookup with the widened radius
    Retry { radius_meters: f64 },
    /// Stop searching; nothing was found within `radius_meters`
    GiveUp { radius_meters: f64 },
}

/// Radius escalation for a single resolution attempt.
///
/// The radius only grows, by a fixed step, and the policy gives up once a
/// lookup fails at or beyond the give-up radius, or after
/// [`SearchConfig::max_attempts`] failures, whichever comes first. A fresh
/// policy is created for every attempt so nothing carries over between
/// coordinates.
#[derive(Debug, Clone)]
pub struct SearchPolicy {
    radius_meters: f64,
    radius_step: f64,
    give_up_radius: f64,
    max_attempts: u32,
    failures: u32,
}

impl SearchPolicy {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            radius_meters: config.initial_radius,
            radius_step: config.radius_step,
            give_up_radius: config.give_up_radius,
            max_attempts: config.max_attempts(),
            failures: 0,
        }
    }

    /// Current search radius in meters.
    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Number of failed lookups seen so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Record a failed lookup at the current radius and decide what comes next.
    ///
    /// The give-up check runs against the radius that just failed, before
    /// widening: with the defaults a failure at 85 m still widens to 110 m and
    /// only the failure at 110 m gives up.
    pub fn on_failure(&mut self) -> SearchDecision {
        self.failures = self.failures.saturating_add(1);
        let exhausted = self.failures >= self.max_attempts;
        let out_of_range = self.radius_meters.is_nan()
            || self.give_up_radius.is_nan()
            || self.radius_meters >= self.give_up_radius;
        if exhausted || out_of_range {
            return SearchDecision::GiveUp {
                radius_meters: self.radius_meters,
            };
        }

        self.radius_meters += self.radius_step;
        SearchDecision::Retry {
            radius_meters: self.radius_meters,
        }
    }
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_LOOKUPS;

    #[test]
    fn test_starts_at_initial_radius() {
        let policy = SearchPolicy::default();
        assert_eq!(policy.radius_meters(), 10.0);
        assert_eq!(policy.failures(), 0);
    }

    #[test]
    fn test_escalation_sequence() {
        let mut policy = SearchPolicy::default();

        assert_eq!(policy.on_failure(), SearchDecision::Retry { radius_meters: 35.0 });
        assert_eq!(policy.on_failure(), SearchDecision::Retry { radius_meters: 60.0 });
        assert_eq!(policy.on_failure(), SearchDecision::Retry { radius_meters: 85.0 });
        // 85 < 100, so one more widening happens
        assert_eq!(policy.on_failure(), SearchDecision::Retry { radius_meters: 110.0 });
        assert_eq!(policy.on_failure(), SearchDecision::GiveUp { radius_meters: 110.0 });
        assert_eq!(policy.failures(), 5);
    }

    #[test]
    fn test_gives_up_exactly_at_threshold() {
        let config = SearchConfig::new().initial_radius(75.0).radius_step(25.0);
        let mut policy = SearchPolicy::new(&config);

        assert_eq!(policy.on_failure(), SearchDecision::Retry { radius_meters: 100.0 });
        assert_eq!(policy.on_failure(), SearchDecision::GiveUp { radius_meters: 100.0 });
    }

    #[test]
    fn test_nan_give_up_radius_stops_after_one_failure() {
        let mut config = SearchConfig::new();
        config.give_up_radius = f64::NAN;
        let mut policy = SearchPolicy::new(&config);

        assert_eq!(policy.on_failure(), SearchDecision::GiveUp { radius_meters: 10.0 });
    }

    #[test]
    fn test_unreachable_give_up_radius_is_capped() {
        let mut config = SearchConfig::new();
        config.radius_step = 0.0;
        let mut policy = SearchPolicy::new(&config);

        let mut failures = 0;
        while let SearchDecision::Retry { .. } = policy.on_failure() {
            failures += 1;
            assert!(failures < MAX_LOOKUPS, "policy never gave up");
        }
        assert_eq!(policy.failures(), MAX_LOOKUPS);
    }

    #[test]
    fn test_radius_is_monotonic() {
        let mut policy = SearchPolicy::default();
        let mut last = policy.radius_meters();
        while let SearchDecision::Retry { radius_meters } = policy.on_failure() {
            assert!(radius_meters > last);
            last = radius_meters;
        }
        assert_eq!(policy.radius_meters(), last);
    }
}
