use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use devcircle_shared::errors::{AppError, ErrorCode};

use crate::schema::{
    comment_likes, comments, content_likes, content_tags, contents, follows, group_members,
    groups, tags, users,
};

// --- Domain enums (stored as text, parsed at the API edge) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Meetup,
    Podcast,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Meetup => "MEETUP",
            Self::Podcast => "PODCAST",
        }
    }

    /// Accepts the lowercase singular/plural spellings the frontend sends
    /// ("post", "posts", ...) as well as the stored uppercase form.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "post" | "posts" => Ok(Self::Post),
            "meetup" | "meetups" => Ok(Self::Meetup),
            "podcast" | "podcasts" => Ok(Self::Podcast),
            _ => Err(AppError::new(
                ErrorCode::InvalidContentKind,
                format!("unknown content type: {raw}"),
            )),
        }
    }

    pub fn from_stored(raw: &str) -> Option<Self> {
        match raw {
            "POST" => Some(Self::Post),
            "MEETUP" => Some(Self::Meetup),
            "PODCAST" => Some(Self::Podcast),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberRole {
    Admin,
    User,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }

    pub fn from_stored(raw: &str) -> Option<Self> {
        match raw {
            "ADMIN" => Some(Self::Admin),
            "USER" => Some(Self::User),
            _ => None,
        }
    }
}

// --- User ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub name: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub bio: Option<String>,
    pub avatar_img: Option<String>,
    pub current_knowledge: Option<String>,
    pub coding_ambitions: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub is_onboarding_completed: bool,
    pub linkedin_name: Option<String>,
    pub linkedin_link: Option<String>,
    pub twitter_name: Option<String>,
    pub twitter_link: Option<String>,
    pub instagram_name: Option<String>,
    pub instagram_link: Option<String>,
    pub followers_count: i32,
    pub following_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub user_name: String,
    pub name: Option<String>,
    pub email: String,
    pub password: Option<String>,
    pub avatar_img: Option<String>,
}

#[derive(Debug, AsChangeset, Deserialize, Default)]
#[diesel(table_name = users)]
pub struct UpdateProfile {
    pub user_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_img: Option<String>,
    pub preferred_skills: Option<Vec<String>>,
    pub linkedin_name: Option<String>,
    pub linkedin_link: Option<String>,
    pub twitter_name: Option<String>,
    pub twitter_link: Option<String>,
    pub instagram_name: Option<String>,
    pub instagram_link: Option<String>,
}

#[derive(Debug, AsChangeset, Deserialize)]
#[diesel(table_name = users)]
pub struct UpdateOnboarding {
    pub current_knowledge: Option<String>,
    pub coding_ambitions: Option<Vec<String>>,
    pub preferred_skills: Option<Vec<String>>,
    pub is_onboarding_completed: Option<bool>,
}

// --- Group ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = groups)]
pub struct Group {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub bio: String,
    pub profile_image: Option<String>,
    pub cover_image: Option<String>,
    pub members_count: i32,
    pub contents_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = groups)]
pub struct NewGroup {
    pub author_id: Uuid,
    pub name: String,
    pub bio: String,
    pub profile_image: Option<String>,
    pub cover_image: Option<String>,
}

#[derive(Debug, AsChangeset, Deserialize, Default)]
#[diesel(table_name = groups)]
pub struct UpdateGroup {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub cover_image: Option<String>,
}

// --- GroupMember ---

#[derive(Debug, Queryable, Serialize)]
#[diesel(table_name = group_members)]
pub struct GroupMember {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = group_members)]
pub struct NewGroupMember {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub role: String,
}

// --- Content ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = contents)]
pub struct Content {
    pub id: Uuid,
    pub content_type: String,
    pub title: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub views_count: i32,
    pub likes_count: i32,
    pub comments_count: i32,
    pub meetup_location: Option<String>,
    pub meetup_location_image: Option<String>,
    pub meetup_date: Option<DateTime<Utc>>,
    pub podcast_file: Option<String>,
    pub podcast_title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    pub fn kind(&self) -> Option<ContentKind> {
        ContentKind::from_stored(&self.content_type)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contents)]
pub struct NewContent {
    pub content_type: String,
    pub title: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub meetup_location: Option<String>,
    pub meetup_location_image: Option<String>,
    pub meetup_date: Option<DateTime<Utc>>,
    pub podcast_file: Option<String>,
    pub podcast_title: Option<String>,
}

/// Field updates shared by all three content kinds. Type is immutable:
/// there is deliberately no `content_type` member here.
#[derive(Debug, AsChangeset, Default)]
#[diesel(table_name = contents)]
pub struct UpdateContent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub meetup_location: Option<String>,
    pub meetup_location_image: Option<String>,
    pub meetup_date: Option<DateTime<Utc>>,
    pub podcast_file: Option<String>,
    pub podcast_title: Option<String>,
}

// --- Tag ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq, Eq)]
#[diesel(table_name = tags)]
pub struct Tag {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tags)]
pub struct NewTag {
    pub title: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = content_tags)]
pub struct NewContentTag {
    pub content_id: Uuid,
    pub tag_id: Uuid,
}

// --- Comment ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: Uuid,
    pub body: String,
    pub author_id: Uuid,
    pub content_id: Uuid,
    pub replying_to_id: Option<Uuid>,
    pub likes_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub body: String,
    pub author_id: Uuid,
    pub content_id: Uuid,
    pub replying_to_id: Option<Uuid>,
}

// --- Relation rows (likes, follows) ---
//
// These tables are only ever counted or probed for existence, so they get
// Insertable structs and nothing else.

#[derive(Debug, Insertable)]
#[diesel(table_name = content_likes)]
pub struct NewContentLike {
    pub user_id: Uuid,
    pub content_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comment_likes)]
pub struct NewCommentLike {
    pub comment_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = follows)]
pub struct NewFollow {
    pub follower_id: Uuid,
    pub following_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_kind_parsing() {
        assert_eq!(ContentKind::parse("posts").unwrap(), ContentKind::Post);
        assert_eq!(ContentKind::parse("Meetup").unwrap(), ContentKind::Meetup);
        assert_eq!(ContentKind::parse("PODCAST").unwrap(), ContentKind::Podcast);
        assert!(ContentKind::parse("story").is_err());
        assert_eq!(ContentKind::Post.as_str(), "POST");
        assert_eq!(ContentKind::from_stored("MEETUP"), Some(ContentKind::Meetup));
        assert_eq!(ContentKind::from_stored("meetup"), None);
    }

    #[test]
    fn member_role_round_trip() {
        assert_eq!(MemberRole::from_stored("ADMIN"), Some(MemberRole::Admin));
        assert_eq!(MemberRole::from_stored("owner"), None);
        assert_eq!(MemberRole::User.as_str(), "USER");
    }

    #[test]
    fn password_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            user_name: "marko".into(),
            name: None,
            email: "marko@example.com".into(),
            password: Some("$argon2id$secret".into()),
            bio: None,
            avatar_img: None,
            current_knowledge: None,
            coding_ambitions: vec![],
            preferred_skills: vec![],
            is_onboarding_completed: false,
            linkedin_name: None,
            linkedin_link: None,
            twitter_name: None,
            twitter_link: None,
            instagram_name: None,
            instagram_link: None,
            followers_count: 0,
            following_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "marko@example.com");
    }
}
