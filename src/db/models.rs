use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Parent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Parent => "parent",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "parent" => Some(Role::Parent),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Moderation status of a post. Every post starts at `PendingParent`;
/// any report escalates it regardless of the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    PendingParent,
    Approved,
    Rejected,
    Escalated,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::PendingParent => "pending_parent",
            PostStatus::Approved => "approved",
            PostStatus::Rejected => "rejected",
            PostStatus::Escalated => "escalated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_parent" => Some(PostStatus::PendingParent),
            "approved" => Some(PostStatus::Approved),
            "rejected" => Some(PostStatus::Rejected),
            "escalated" => Some(PostStatus::Escalated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Youtube,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Youtube => "youtube",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaType::Image),
            "video" => Some(MediaType::Video),
            "youtube" => Some(MediaType::Youtube),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Dismissed,
    Actioned,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Dismissed => "dismissed",
            ReportStatus::Actioned => "actioned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReportStatus::Pending),
            "reviewed" => Some(ReportStatus::Reviewed),
            "dismissed" => Some(ReportStatus::Dismissed),
            "actioned" => Some(ReportStatus::Actioned),
            _ => None,
        }
    }
}

/// Closed classification set for reports. Unrecognized input coerces to
/// `Other` instead of failing intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    Inappropriate,
    Suggestive,
    Inaccurate,
    Misleading,
    Spam,
    Harassment,
    Dangerous,
    Copyright,
    Other,
}

impl ReasonCategory {
    pub const ALL: [ReasonCategory; 9] = [
        ReasonCategory::Inappropriate,
        ReasonCategory::Suggestive,
        ReasonCategory::Inaccurate,
        ReasonCategory::Misleading,
        ReasonCategory::Spam,
        ReasonCategory::Harassment,
        ReasonCategory::Dangerous,
        ReasonCategory::Copyright,
        ReasonCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCategory::Inappropriate => "inappropriate",
            ReasonCategory::Suggestive => "suggestive",
            ReasonCategory::Inaccurate => "inaccurate",
            ReasonCategory::Misleading => "misleading",
            ReasonCategory::Spam => "spam",
            ReasonCategory::Harassment => "harassment",
            ReasonCategory::Dangerous => "dangerous",
            ReasonCategory::Copyright => "copyright",
            ReasonCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    pub fn coerce(s: &str) -> Self {
        Self::parse(s).unwrap_or(ReasonCategory::Other)
    }
}

/// Audit-event kinds written to the moderation log. The serialized tags
/// are part of the stored format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    ParentApprove,
    ParentReject,
    Approve,
    Reject,
    ReportDismissed,
    ReportReviewed,
    ReportActionApprove,
    ReportActionReject,
    ReportBulkDismiss,
    ReportBulkReviewed,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::ParentApprove => "parent-approve",
            ModerationAction::ParentReject => "parent-reject",
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::ReportDismissed => "report-dismissed",
            ModerationAction::ReportReviewed => "report-reviewed",
            ModerationAction::ReportActionApprove => "report-action-approve",
            ModerationAction::ReportActionReject => "report-action-reject",
            ModerationAction::ReportBulkDismiss => "report-bulk-dismiss",
            ModerationAction::ReportBulkReviewed => "report-bulk-reviewed",
        }
    }
}

macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(self.as_str().into())
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                <$ty>::parse(s).ok_or(FromSqlError::InvalidType)
            }
        }
    };
}

sql_text_enum!(Role);
sql_text_enum!(PostStatus);
sql_text_enum!(MediaType);
sql_text_enum!(ReportStatus);
sql_text_enum!(ReasonCategory);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub age_range: Option<String>,
    pub parental_consent: bool,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub media_type: MediaType,
    pub category: String,
    pub tags: String,
    pub status: PostStatus,
    pub likes_count: i64,
    pub parent_approved_by: Option<i64>,
    pub created_at: String,
}

impl Post {
    pub const COLUMNS: &'static str = "id, user_id, title, description, media_url, media_type, \
         category, tags, status, likes_count, parent_approved_by, created_at";

    /// COLUMNS with a table alias prefix, for joined queries.
    pub fn columns_with(alias: &str) -> String {
        Self::COLUMNS
            .split(", ")
            .map(|c| format!("{alias}.{c}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Post {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            media_url: row.get(4)?,
            media_type: row.get(5)?,
            category: row.get(6)?,
            tags: row.get(7)?,
            status: row.get(8)?,
            likes_count: row.get(9)?,
            parent_approved_by: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub post_id: i64,
    pub reporter_id: Option<i64>,
    pub reason_category: ReasonCategory,
    pub reason: String,
    pub status: ReportStatus,
    pub staff_notes: Option<String>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<String>,
    pub created_at: String,
}

/// A report joined with the post and display names staff need for
/// context.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    pub post_title: Option<String>,
    pub post_status: Option<PostStatus>,
    pub reporter_name: Option<String>,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSummary {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}
