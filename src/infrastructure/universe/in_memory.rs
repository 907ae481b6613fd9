use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::Deserialize;
use tracing::info;

use crate::domain::error::DomainError;
use crate::domain::ports::ticker_universe::TickerUniverse;
use crate::domain::values::market_scope::MarketScope;

const US_NAME_SUFFIXES: &[&str] = &[
    ", Inc.", " Inc.", " Inc", " Corporation", " Corp.", " Corp", " Co.", " Ltd.", " plc",
    " Holdings",
];

/// One entry of the universe file: `[{ "symbol", "name", "market" }]`.
#[derive(Debug, Clone, Deserialize)]
pub struct UniverseEntry {
    pub symbol: String,
    pub name: String,
    pub market: MarketScope,
}

#[derive(Debug, Default)]
struct ScopeTable {
    names: HashMap<String, String>,
    /// (match key, symbol), longest key first.
    name_keys: Vec<(String, String)>,
}

/// In-memory universe. A scope is cold until `load` is called for it.
#[derive(Debug, Default)]
pub struct InMemoryTickerUniverse {
    scopes: RwLock<HashMap<MarketScope, ScopeTable>>,
}

fn min_name_len(scope: MarketScope) -> usize {
    match scope {
        MarketScope::Kr => 2,
        MarketScope::Us => 3,
    }
}

fn name_key(scope: MarketScope, name: &str) -> String {
    let mut key = name.trim();
    if scope == MarketScope::Us {
        for suffix in US_NAME_SUFFIXES {
            if let Some(stripped) = key.strip_suffix(suffix) {
                key = stripped.trim_end();
                break;
            }
        }
    }
    key.to_lowercase()
}

impl InMemoryTickerUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the table for `scope`, marking it loaded even when empty.
    pub fn load<I>(&self, scope: MarketScope, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut table = ScopeTable::default();
        for (symbol, name) in entries {
            let key = name_key(scope, &name);
            if key.chars().count() >= min_name_len(scope) {
                table.name_keys.push((key, symbol.clone()));
            }
            table.names.insert(symbol, name);
        }
        table
            .name_keys
            .sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()).then(a.0.cmp(&b.0)));
        let mut scopes = self.scopes.write().unwrap_or_else(|e| e.into_inner());
        scopes.insert(scope, table);
    }

    /// Load every scope present in a JSON universe file.
    pub fn load_json_file(&self, path: impl AsRef<Path>) -> Result<usize, DomainError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DomainError::InvalidInput(format!("universe file {}: {e}", path.display())))?;
        let entries: Vec<UniverseEntry> = serde_json::from_str(&raw)?;
        let total = entries.len();

        let mut by_scope: HashMap<MarketScope, Vec<(String, String)>> = HashMap::new();
        for entry in entries {
            by_scope
                .entry(entry.market)
                .or_default()
                .push((entry.symbol, entry.name));
        }
        for (scope, rows) in by_scope {
            info!(scope = %scope, symbols = rows.len(), "ticker universe loaded");
            self.load(scope, rows);
        }
        Ok(total)
    }
}

impl TickerUniverse for InMemoryTickerUniverse {
    fn is_loaded(&self, scope: MarketScope) -> bool {
        let scopes = self.scopes.read().unwrap_or_else(|e| e.into_inner());
        scopes.contains_key(&scope)
    }

    fn contains(&self, scope: MarketScope, symbol: &str) -> bool {
        let scopes = self.scopes.read().unwrap_or_else(|e| e.into_inner());
        scopes
            .get(&scope)
            .is_some_and(|t| t.names.contains_key(symbol))
    }

    fn name_for(&self, scope: MarketScope, symbol: &str) -> Option<String> {
        let scopes = self.scopes.read().unwrap_or_else(|e| e.into_inner());
        scopes.get(&scope)?.names.get(symbol).cloned()
    }

    fn extract_candidates(&self, scope: MarketScope, text: &str) -> Vec<String> {
        let scopes = self.scopes.read().unwrap_or_else(|e| e.into_inner());
        let Some(table) = scopes.get(&scope) else {
            return Vec::new();
        };
        let haystack = text.to_lowercase();
        let mut found: Vec<String> = Vec::new();
        for (key, symbol) in &table.name_keys {
            if haystack.contains(key.as_str()) && !found.contains(symbol) {
                found.push(symbol.clone());
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn kr() -> InMemoryTickerUniverse {
        let u = InMemoryTickerUniverse::new();
        u.load(
            MarketScope::Kr,
            [
                ("005930".to_string(), "삼성전자".to_string()),
                ("000660".to_string(), "SK하이닉스".to_string()),
                ("003550".to_string(), "LG".to_string()),
                ("999990".to_string(), "가".to_string()),
            ],
        );
        u
    }

    #[test]
    fn scopes_start_cold() {
        let u = kr();
        assert!(u.is_loaded(MarketScope::Kr));
        assert!(!u.is_loaded(MarketScope::Us));
        assert!(u.contains(MarketScope::Kr, "005930"));
        assert!(!u.contains(MarketScope::Kr, "123450"));
        assert_eq!(u.name_for(MarketScope::Kr, "000660").as_deref(), Some("SK하이닉스"));
    }

    #[test]
    fn names_in_text_become_candidates() {
        let u = kr();
        let found = u.extract_candidates(MarketScope::Kr, "삼성전자와 sk하이닉스 동반 강세, 가격은");
        assert_eq!(found, vec!["000660", "005930"]);
    }

    #[test]
    fn us_names_drop_corporate_suffixes() {
        let u = InMemoryTickerUniverse::new();
        u.load(
            MarketScope::Us,
            [
                ("AAPL".to_string(), "Apple Inc.".to_string()),
                ("GE".to_string(), "GE".to_string()),
            ],
        );
        assert_eq!(u.extract_candidates(MarketScope::Us, "apple unveils"), vec!["AAPL"]);
        assert!(u.extract_candidates(MarketScope::Us, "GE rallies").is_empty());
    }

    #[test]
    fn loads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"symbol":"005930","name":"삼성전자","market":"kr"}},
                {{"symbol":"AAPL","name":"Apple Inc.","market":"us"}}]"#
        )
        .unwrap();
        let u = InMemoryTickerUniverse::new();
        assert_eq!(u.load_json_file(file.path()).unwrap(), 2);
        assert!(u.is_loaded(MarketScope::Kr));
        assert!(u.contains(MarketScope::Us, "AAPL"));
    }
}
