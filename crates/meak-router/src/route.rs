//! Route locations.

use std::fmt;
use std::str::FromStr;

use crate::RouterError;

/// The current navigation location as an ordered list of path segments.
///
/// Group segments keep their parentheses: `/(auth)/login` has the
/// segments `["(auth)", "login"]`. The root has no segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RouteLocation {
    segments: Vec<String>,
}

impl RouteLocation {
    /// Splits a path on `/`, dropping empty pieces. Never fails; use
    /// `str::parse` to reject relative paths.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        Self {
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn first_segment(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Returns `true` if the first segment is exactly `group`. The root is
    /// outside every group.
    pub fn is_in_group(&self, group: &str) -> bool {
        self.first_segment() == Some(group)
    }
}

impl fmt::Display for RouteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for RouteLocation {
    type Err = RouterError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        if !path.starts_with('/') {
            return Err(RouterError::InvalidRoute(path.to_string()));
        }
        Ok(Self::parse(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_group_and_screen() {
        let loc = RouteLocation::parse("/(auth)/login");
        assert_eq!(loc.segments(), ["(auth)", "login"]);
        assert!(loc.is_in_group("(auth)"));
    }

    #[test]
    fn test_parse_root_has_no_segments() {
        let loc = RouteLocation::parse("/");
        assert!(loc.segments().is_empty());
        assert!(!loc.is_in_group("(auth)"));
        assert_eq!(loc.to_string(), "/");
    }

    #[test]
    fn test_parse_ignores_query_and_extra_slashes() {
        let loc = RouteLocation::parse("//(tabs)//bookings/?tab=active");
        assert_eq!(loc.to_string(), "/(tabs)/bookings");
    }

    #[test]
    fn test_group_match_is_exact() {
        let loc = RouteLocation::from_segments(["auth", "login"]);
        assert!(!loc.is_in_group("(auth)"));
        let loc = RouteLocation::from_segments(["(tabs)", "(auth)"]);
        assert!(!loc.is_in_group("(auth)"));
    }

    #[test]
    fn test_from_str_rejects_relative_path() {
        assert!(matches!(
            "login".parse::<RouteLocation>(),
            Err(RouterError::InvalidRoute(_))
        ));
        assert_eq!(
            "/(tabs)".parse::<RouteLocation>().unwrap().first_segment(),
            Some("(tabs)")
        );
    }
}
