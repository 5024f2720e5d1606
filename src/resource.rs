//! Paged resource catalogue
//!
//! Each paged endpoint is plain data: where it lives, which response field
//! holds its records, how it pages, and which references it expands.

use crate::expand::{ExpansionRule, COMMENT_LINK_RULES, FEED_RULES};
use crate::types::Profile;

/// Page-size behaviour of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    /// Send `limit=<n>` unless the client overrides the size
    Fixed(u32),
    /// The endpoint rejects `limit`; never send it
    Suppressed,
}

/// Profile field a resource is queried by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKey {
    /// No subject parameter
    None,
    /// `id=<profile id>`
    Id,
    /// `username=<profile username>`
    Username,
    /// `tag=<profile tag>`
    Tag,
}

/// One paged endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    /// Short name used in logs and lookups
    pub name: &'static str,
    /// Path relative to the API base URL
    pub path: &'static str,
    /// Response field holding the page's records
    pub result_field: &'static str,
    /// Page-size behaviour
    pub page_size: PageSize,
    /// Subject parameter
    pub query: QueryKey,
    /// Fixed extra query parameters
    pub extra_query: &'static [(&'static str, &'static str)],
    /// Referrer path (appended to the web origin) replacing the profile's
    pub referrer_path: Option<&'static str>,
    /// References resolved on every page
    pub expansion: &'static [ExpansionRule],
}

const REVERSE: &[(&str, &str)] = &[("reverse", "true")];

pub const FEED: Resource = Resource {
    name: "feed",
    path: "v1/feed",
    result_field: "posts",
    page_size: PageSize::Fixed(10),
    query: QueryKey::None,
    extra_query: &[],
    referrer_path: None,
    expansion: FEED_RULES,
};

pub const POSTS: Resource = Resource {
    name: "posts",
    path: "v1/post/creator",
    result_field: "posts",
    page_size: PageSize::Fixed(20),
    query: QueryKey::Id,
    extra_query: &[],
    referrer_path: None,
    expansion: FEED_RULES,
};

pub const FOLLOWING: Resource = Resource {
    name: "following",
    path: "v1/follow/following",
    result_field: "followees",
    page_size: PageSize::Fixed(10),
    query: QueryKey::Id,
    extra_query: &[],
    referrer_path: None,
    expansion: &[],
};

pub const FOLLOWERS: Resource = Resource {
    name: "followers",
    path: "v1/follow/followers",
    result_field: "followers",
    page_size: PageSize::Fixed(10),
    query: QueryKey::Id,
    extra_query: &[],
    referrer_path: None,
    expansion: &[],
};

pub const USER_COMMENTS: Resource = Resource {
    name: "user_comments",
    path: "v1/comment/creator",
    result_field: "comments",
    page_size: PageSize::Fixed(10),
    query: QueryKey::Username,
    extra_query: &[],
    referrer_path: None,
    expansion: COMMENT_LINK_RULES,
};

pub const POST_COMMENTS: Resource = Resource {
    name: "post_comments",
    path: "v1/comment",
    result_field: "comments",
    page_size: PageSize::Suppressed,
    query: QueryKey::Id,
    extra_query: REVERSE,
    referrer_path: None,
    expansion: FEED_RULES,
};

/// Same endpoint as [`POST_COMMENTS`], addressed by comment id
pub const COMMENT_REPLIES: Resource = Resource {
    name: "comment_replies",
    ..POST_COMMENTS
};

pub const TAG: Resource = Resource {
    name: "tag",
    path: "v1/post/hashtag",
    result_field: "posts",
    page_size: PageSize::Fixed(10),
    query: QueryKey::Tag,
    extra_query: &[],
    referrer_path: None,
    expansion: FEED_RULES,
};

pub const VOTES: Resource = Resource {
    name: "votes",
    path: "v1/post/creator/liked",
    result_field: "posts",
    page_size: PageSize::Fixed(10),
    query: QueryKey::Id,
    extra_query: &[],
    referrer_path: None,
    expansion: FEED_RULES,
};

pub const AFFILIATE_NEWS: Resource = Resource {
    name: "affiliate_news",
    path: "v1/discover/news",
    result_field: "links",
    page_size: PageSize::Fixed(20),
    query: QueryKey::Id,
    extra_query: &[],
    referrer_path: Some("/discover"),
    expansion: &[],
};

pub const MODERATION: Resource = Resource {
    name: "moderation",
    path: "v1/moderation/pending",
    result_field: "comments",
    page_size: PageSize::Suppressed,
    query: QueryKey::Id,
    extra_query: &[],
    referrer_path: Some("/moderation"),
    expansion: &[],
};

/// Every paged resource
pub const ALL: &[Resource] = &[
    FEED,
    POSTS,
    FOLLOWING,
    FOLLOWERS,
    USER_COMMENTS,
    POST_COMMENTS,
    COMMENT_REPLIES,
    TAG,
    VOTES,
    AFFILIATE_NEWS,
    MODERATION,
];

impl Resource {
    /// Look a resource up by name
    pub fn by_name(name: &str) -> Option<&'static Resource> {
        ALL.iter().find(|r| r.name == name)
    }

    /// `limit` to send, given the client-wide override
    pub fn effective_page_size(&self, override_size: Option<u32>) -> Option<u32> {
        match self.page_size {
            PageSize::Suppressed => None,
            PageSize::Fixed(size) => Some(override_size.unwrap_or(size)),
        }
    }

    /// Subject and fixed parameters, in request order.
    ///
    /// A subject field missing from the profile is simply not sent.
    pub fn query_params(&self, profile: &Profile) -> Vec<(&'static str, String)> {
        let subject = match self.query {
            QueryKey::None => None,
            QueryKey::Id => profile.id.clone().map(|v| ("id", v)),
            QueryKey::Username => profile.username.clone().map(|v| ("username", v)),
            QueryKey::Tag => profile.tag.clone().map(|v| ("tag", v)),
        };

        subject
            .into_iter()
            .chain(self.extra_query.iter().map(|(k, v)| (*k, (*v).to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_names_are_unique() {
        for resource in ALL {
            assert_eq!(Resource::by_name(resource.name), Some(resource));
        }
        assert!(Resource::by_name("timeline").is_none());
    }

    #[test]
    fn test_effective_page_size() {
        assert_eq!(FEED.effective_page_size(None), Some(10));
        assert_eq!(POSTS.effective_page_size(None), Some(20));
        assert_eq!(FEED.effective_page_size(Some(50)), Some(50));
        assert_eq!(MODERATION.effective_page_size(Some(50)), None);
        assert_eq!(POST_COMMENTS.effective_page_size(None), None);
    }

    #[test]
    fn test_query_params() {
        let profile = Profile::with_id("p1").username("alice");

        assert!(FEED.query_params(&profile).is_empty());
        assert_eq!(POSTS.query_params(&profile), vec![("id", "p1".to_string())]);
        assert_eq!(
            USER_COMMENTS.query_params(&profile),
            vec![("username", "alice".to_string())]
        );
        assert_eq!(
            COMMENT_REPLIES.query_params(&profile),
            vec![("id", "p1".to_string()), ("reverse", "true".to_string())]
        );
        assert_eq!(
            TAG.query_params(&Profile::with_tag("news")),
            vec![("tag", "news".to_string())]
        );
    }

    #[test]
    fn test_missing_subject_is_omitted() {
        assert!(POSTS.query_params(&Profile::new()).is_empty());
    }
}
