/// Decides whether the running total warrants a notification.
pub trait AlertPolicy: Send {
    /// Pure function of the total.
    fn should_alert(&self, total: u64) -> bool;

    /// The configured threshold, if the policy has one.
    fn threshold(&self) -> Option<u64> {
        None
    }
}

/// Alerts once the total reaches a fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdPolicy {
    threshold: u64,
}

impl ThresholdPolicy {
    /// A threshold of 0 is raised to 1; an empty scene never alerts.
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::new(5)
    }
}

impl AlertPolicy for ThresholdPolicy {
    fn should_alert(&self, total: u64) -> bool {
        total >= self.threshold
    }

    fn threshold(&self) -> Option<u64> {
        Some(self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let policy = ThresholdPolicy::new(3);
        assert!(!policy.should_alert(2));
        assert!(policy.should_alert(3));
        assert!(policy.should_alert(4));
    }

    #[test]
    fn test_zero_threshold_is_raised() {
        let policy = ThresholdPolicy::new(0);
        assert_eq!(policy.threshold(), Some(1));
        assert!(!policy.should_alert(0));
    }
}
