use crate::domain::values::market_scope::MarketScope;

/// Known-ticker universe and name lookup for one or more market scopes.
///
/// A scope that has never been loaded is *cold*: callers must treat every
/// syntactically valid symbol as a member rather than filtering everything out.
pub trait TickerUniverse: Send + Sync {
    fn is_loaded(&self, scope: MarketScope) -> bool;

    /// Membership test. Meaningless for a cold scope.
    fn contains(&self, scope: MarketScope, symbol: &str) -> bool;

    fn name_for(&self, scope: MarketScope, symbol: &str) -> Option<String>;

    /// Symbols whose company name appears in `text`.
    fn extract_candidates(&self, scope: MarketScope, text: &str) -> Vec<String>;
}
