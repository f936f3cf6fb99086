use std::{fmt::Display, ops::Deref};

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// The provider-assigned node identifier of a repository.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct RepositoryId(pub String);

impl Deref for RepositoryId {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The full `owner/name` of a repository, unique within the provider.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct RepositoryFullName(pub String);

impl Deref for RepositoryFullName {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for RepositoryFullName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The number of stars a repository has.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct StarCount(pub u32);

impl Deref for StarCount {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for StarCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata of a crawled repository.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Repository {
    /// The provider-assigned node identifier.
    id: RepositoryId,

    /// The full `owner/name` of the repository.
    full_name: RepositoryFullName,

    /// The number of stars the repository has.
    star_count: StarCount,

    /// When the repository was created at the provider.
    created_at: DateTime<Utc>,
}

impl Repository {
    /// Creates a new `Repository` instance.
    pub fn new(id: &str, full_name: &str, star_count: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            id: RepositoryId(id.to_string()),
            full_name: RepositoryFullName(full_name.to_string()),
            star_count: StarCount(star_count),
            created_at,
        }
    }

    /// Retrieves the provider-assigned identifier.
    pub fn id(&self) -> &RepositoryId {
        &self.id
    }

    /// Retrieves the full name.
    pub fn full_name(&self) -> &RepositoryFullName {
        &self.full_name
    }

    /// Retrieves the star count.
    pub fn star_count(&self) -> &StarCount {
        &self.star_count
    }

    /// Retrieves the creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The storage identity: the provider identifier when available,
    /// otherwise the full name.
    pub fn identity(&self) -> &str {
        if self.id.is_empty() {
            &self.full_name
        } else {
            &self.id
        }
    }
}

impl Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Repository: {}, Stars: {}, Created: {}",
            self.full_name,
            self.star_count,
            self.created_at.to_rfc3339()
        )
    }
}

/// A snapshot of the provider-reported request quota.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    /// The maximum number of requests that can be made in a given time period.
    pub limit: i32,
    /// The cost of the current request.
    pub cost: i32,
    /// The remaining number of requests that can be made in the current time period.
    pub remaining: i32,
    /// The time at which the rate limit will reset.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitSnapshot {
    #[cfg(test)]
    /// Creates a dummy `RateLimitSnapshot` instance for testing purposes.
    pub fn dummy() -> Self {
        Self {
            limit: 5000,
            cost: 1,
            remaining: 4999,
            reset_at: "2025-01-01T00:00:00Z".parse().unwrap(),
        }
    }
}

impl Display for RateLimitSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RateLimit: calls={}/{} (+{}), reset={}",
            self.limit - self.remaining,
            self.limit,
            self.cost,
            self.reset_at.to_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn repository_created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn identity_prefers_provider_identifier() {
        let repository = Repository::new("R_abc123", "org-1/repository-1", 42, repository_created_at());

        assert_eq!("R_abc123", repository.identity());
    }

    #[test]
    fn identity_falls_back_to_full_name() {
        let repository = Repository::new("", "org-1/repository-1", 42, repository_created_at());

        assert_eq!("org-1/repository-1", repository.identity());
    }

    #[test]
    fn repository_display_contains_name_and_stars() {
        let repository = Repository::new("R_abc123", "org-1/repository-1", 42, repository_created_at());

        let rendered = repository.to_string();

        assert!(rendered.contains("org-1/repository-1"));
        assert!(rendered.contains("42"));
    }
}
