// Rank tiers: a user's rank is a pure function of their point total.

/// Points every new account starts with.
pub const WELCOME_BONUS: i64 = 100;

/// Points awarded for each response to a help request.
pub const HELP_RESPONSE_POINTS: i64 = 25;

/// Ascending (threshold, name) tiers.
pub const RANK_TIERS: [(i64, &str); 6] = [
    (0, "Newcomer"),
    (250, "Community Helper"),
    (500, "Linked-Arms Hero"),
    (1000, "Bayanihan Champion"),
    (2000, "Community Guardian"),
    (5000, "SafeZone Legend"),
];

/// Name of the highest tier whose threshold `points` meets. Totals below the
/// first threshold still get the first tier.
pub fn compute_rank(points: i64) -> &'static str {
    RANK_TIERS
        .iter()
        .rev()
        .find(|(threshold, _)| points >= *threshold)
        .map_or(RANK_TIERS[0].1, |(_, name)| *name)
}
