//! Invalidation Recipes
//!
//! Mutation flows (add, edit, delete, favorite, purchase, login, logout) call
//! into this module to drop cache keys their change made stale. A recipe is a
//! fixed set of exact keys and `*` patterns; applying one is stateless and
//! idempotent.
//!
//! Key conventions for an entity type `land` (plural `lands`):
//! - detail: `land-details-<id>`
//! - lists: `available-lands-*`, `lands-*`, `search-lands-*`, `filtered-lands-*`
//! - user singletons: `my-lands`, `favorite-lands`
//! - cross-cutting aggregate: `portfolio-*`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::Cache;
use crate::error::CacheError;

/// Aggregate keys spanning every entity type.
const PORTFOLIO_PATTERN: &str = "portfolio-*";

/// Per-user keys not tied to a single entity type.
const USER_PATTERNS: [&str; 3] = ["user-*", "my-purchases*", "purchase-history*"];

// == Entity Type ==
/// Listing entity types with their own cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Land,
    House,
    Apartment,
    Service,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Land,
        EntityType::House,
        EntityType::Apartment,
        EntityType::Service,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Land => "land",
            EntityType::House => "house",
            EntityType::Apartment => "apartment",
            EntityType::Service => "service",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            EntityType::Land => "lands",
            EntityType::House => "houses",
            EntityType::Apartment => "apartments",
            EntityType::Service => "services",
        }
    }

    /// Detail cache key for one entity.
    pub fn detail_key(&self, id: &str) -> String {
        format!("{}-details-{}", self.as_str(), id)
    }

    /// Patterns covering every list, search and filter key of this type.
    pub fn list_patterns(&self) -> Vec<String> {
        let plural = self.plural();
        vec![
            format!("available-{plural}-*"),
            format!("{plural}-*"),
            format!("search-{plural}-*"),
            format!("filtered-{plural}-*"),
        ]
    }

    /// The current user's "my" singleton key.
    pub fn my_key(&self) -> String {
        format!("my-{}", self.plural())
    }

    /// The current user's favorites singleton key.
    pub fn favorite_key(&self) -> String {
        format!("favorite-{}", self.plural())
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "land" | "lands" => Ok(EntityType::Land),
            "house" | "houses" => Ok(EntityType::House),
            "apartment" | "apartments" => Ok(EntityType::Apartment),
            "service" | "services" => Ok(EntityType::Service),
            _ => Err(CacheError::InvalidEntityType(s.to_string())),
        }
    }
}

// == Cache Action ==
/// Mutation flows that trigger invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheAction {
    Add,
    Edit,
    Delete,
    Favorite,
    Purchase,
    Login,
    Logout,
}

impl CacheAction {
    /// Whether the action concerns a specific entity type.
    pub fn needs_entity(&self) -> bool {
        !matches!(self, CacheAction::Login | CacheAction::Logout)
    }
}

impl FromStr for CacheAction {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(CacheAction::Add),
            "edit" => Ok(CacheAction::Edit),
            "delete" => Ok(CacheAction::Delete),
            "favorite" => Ok(CacheAction::Favorite),
            "purchase" => Ok(CacheAction::Purchase),
            "login" => Ok(CacheAction::Login),
            "logout" => Ok(CacheAction::Logout),
            _ => Err(CacheError::InvalidAction(s.to_string())),
        }
    }
}

// == Recipe ==
/// Keys and patterns invalidated together for one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipe {
    pub keys: Vec<String>,
    pub patterns: Vec<String>,
}

impl Recipe {
    /// Full invalidation for one entity type: the entity's detail key (when
    /// an id is given), every list of the type, the portfolio aggregate and
    /// the user's "my" and favorite singletons.
    pub fn for_entity(entity: EntityType, id: Option<&str>) -> Self {
        let mut keys = Vec::new();
        if let Some(id) = id {
            keys.push(entity.detail_key(id));
        }
        keys.push(entity.my_key());
        keys.push(entity.favorite_key());

        let mut patterns = entity.list_patterns();
        patterns.push(PORTFOLIO_PATTERN.to_string());

        Self { keys, patterns }
    }

    /// Favorites changed: the favorites singleton and the entity's detail.
    pub fn for_favorite(entity: EntityType, id: Option<&str>) -> Self {
        let mut keys = vec![entity.favorite_key()];
        if let Some(id) = id {
            keys.push(entity.detail_key(id));
        }
        Self {
            keys,
            patterns: Vec::new(),
        }
    }

    /// Everything scoped to the signed-in user, across entity types.
    pub fn for_user_session() -> Self {
        let keys = EntityType::ALL
            .iter()
            .flat_map(|entity| [entity.my_key(), entity.favorite_key()])
            .collect();
        let mut patterns: Vec<String> = USER_PATTERNS.iter().map(|p| p.to_string()).collect();
        patterns.push(PORTFOLIO_PATTERN.to_string());

        Self { keys, patterns }
    }

    /// Picks the recipe for `action`.
    ///
    /// Entity-scoped actions without an entity yield an empty recipe.
    pub fn for_action(action: CacheAction, entity: Option<EntityType>, id: Option<&str>) -> Self {
        match (action, entity) {
            (CacheAction::Login | CacheAction::Logout, _) => Self::for_user_session(),
            (CacheAction::Favorite, Some(entity)) => Self::for_favorite(entity, id),
            (
                CacheAction::Add | CacheAction::Edit | CacheAction::Delete | CacheAction::Purchase,
                Some(entity),
            ) => Self::for_entity(entity, id),
            (_, None) => Self::default(),
        }
    }

    /// Applies the recipe, returning how many entries were removed.
    pub fn apply(&self, cache: &Cache) -> usize {
        let exact: usize = self
            .keys
            .iter()
            .filter(|key| cache.remove(key))
            .count();
        let matched: usize = self
            .patterns
            .iter()
            .map(|pattern| cache.invalidate_by_pattern(pattern))
            .sum();
        exact + matched
    }
}

// == Dispatch ==
/// Invalidates what a typed mutation made stale.
pub fn invalidate(
    cache: &Cache,
    action: CacheAction,
    entity: Option<EntityType>,
    id: Option<&str>,
) -> usize {
    if action.needs_entity() && entity.is_none() {
        warn!("Invalidation for {:?} needs an entity type; skipped", action);
        return 0;
    }

    let removed = Recipe::for_action(action, entity, id).apply(cache);
    debug!(
        "Invalidated {} entries for {:?} on {:?} (id={:?})",
        removed, action, entity, id
    );
    removed
}

/// String-keyed dispatch used by mutation flows.
///
/// Unknown actions, or unknown entity types for entity-scoped actions, are
/// logged and invalidate nothing.
pub fn smart_invalidation(cache: &Cache, action: &str, entity: &str, id: Option<&str>) -> usize {
    let action = match action.parse::<CacheAction>() {
        Ok(action) => action,
        Err(e) => {
            warn!("{}; no invalidation performed", e);
            return 0;
        }
    };

    let entity = if action.needs_entity() {
        match entity.parse::<EntityType>() {
            Ok(entity) => Some(entity),
            Err(e) => {
                warn!("{}; no invalidation performed", e);
                return 0;
            }
        }
    } else {
        entity.parse::<EntityType>().ok()
    };

    invalidate(cache, action, entity, id)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{
        CacheStore, ManualClock, MemoryStorage, DEFAULT_STORAGE_KEY, DEFAULT_TTL,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn test_cache() -> Cache {
        Cache::new(
            CacheStore::new(100, DEFAULT_TTL)
                .with_persisted(Arc::new(MemoryStorage::new()), DEFAULT_STORAGE_KEY)
                .with_clock(Arc::new(ManualClock::new(0))),
        )
    }

    fn seed(cache: &Cache, keys: &[&str]) {
        for key in keys {
            cache.set(key, json!(key), None, false);
        }
    }

    #[test]
    fn test_parse_actions_and_types() {
        assert_eq!("ADD".parse::<CacheAction>().unwrap(), CacheAction::Add);
        assert_eq!("houses".parse::<EntityType>().unwrap(), EntityType::House);
        assert!(matches!(
            "archive".parse::<CacheAction>(),
            Err(CacheError::InvalidAction(_))
        ));
        assert!(matches!(
            "castle".parse::<EntityType>(),
            Err(CacheError::InvalidEntityType(_))
        ));
    }

    #[test]
    fn test_entity_recipe_contents() {
        let recipe = Recipe::for_entity(EntityType::Land, Some("7"));

        assert!(recipe.keys.contains(&"land-details-7".to_string()));
        assert!(recipe.keys.contains(&"my-lands".to_string()));
        assert!(recipe.keys.contains(&"favorite-lands".to_string()));
        assert!(recipe.patterns.contains(&"available-lands-*".to_string()));
        assert!(recipe.patterns.contains(&"portfolio-*".to_string()));
    }

    #[test]
    fn test_add_land_drops_lists_only_for_lands() {
        let cache = test_cache();
        seed(
            &cache,
            &[
                "available-lands-1-6",
                "search-lands-beach",
                "land-details-1",
                "available-houses-1-6",
                "portfolio-summary",
                "my-lands",
            ],
        );

        smart_invalidation(&cache, "add", "land", None);

        assert!(cache.get("available-lands-1-6").is_none());
        assert!(cache.get("search-lands-beach").is_none());
        assert!(cache.get("portfolio-summary").is_none());
        assert!(cache.get("my-lands").is_none());
        assert!(cache.get("land-details-1").is_some());
        assert!(cache.get("available-houses-1-6").is_some());
    }

    #[test]
    fn test_delete_with_id_drops_detail() {
        let cache = test_cache();
        seed(&cache, &["house-details-3", "house-details-4"]);

        smart_invalidation(&cache, "delete", "house", Some("3"));

        assert!(cache.get("house-details-3").is_none());
        assert!(cache.get("house-details-4").is_some());
    }

    #[test]
    fn test_favorite_recipe() {
        let cache = test_cache();
        seed(
            &cache,
            &["favorite-apartments", "apartment-details-9", "available-apartments-1-6"],
        );

        smart_invalidation(&cache, "favorite", "apartment", Some("9"));

        assert!(cache.get("favorite-apartments").is_none());
        assert!(cache.get("apartment-details-9").is_none());
        assert!(cache.get("available-apartments-1-6").is_some());
    }

    #[test]
    fn test_logout_drops_user_scoped_keys() {
        let cache = test_cache();
        seed(
            &cache,
            &["my-services", "favorite-houses", "user-profile", "land-details-1"],
        );

        smart_invalidation(&cache, "logout", "", None);

        assert!(cache.get("my-services").is_none());
        assert!(cache.get("favorite-houses").is_none());
        assert!(cache.get("user-profile").is_none());
        assert!(cache.get("land-details-1").is_some());
    }

    #[test]
    fn test_unknown_action_is_noop() {
        let cache = test_cache();
        seed(&cache, &["available-lands-1-6"]);

        assert_eq!(smart_invalidation(&cache, "archive", "land", None), 0);
        assert_eq!(smart_invalidation(&cache, "add", "castle", None), 0);
        assert!(cache.get("available-lands-1-6").is_some());
    }

    #[test]
    fn test_recipe_is_idempotent() {
        let cache = test_cache();
        seed(&cache, &["available-lands-1-6", "my-lands"]);

        assert_eq!(smart_invalidation(&cache, "edit", "land", Some("1")), 2);
        assert_eq!(smart_invalidation(&cache, "edit", "land", Some("1")), 0);
        assert!(cache.memory_keys().is_empty());
    }
}
