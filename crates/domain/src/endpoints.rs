//! Typed endpoint catalog
//!
//! Maps logical platform operations to their HTTP method and path. The
//! catalog is data only: the client resolves the rendered path against its
//! base URL like any other relative path.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::impl_str_enum_conversions;

/// HTTP methods used by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl_str_enum_conversions!(HttpMethod {
    Get => "GET",
    Post => "POST",
    Put => "PUT",
    Patch => "PATCH",
    Delete => "DELETE",
});

macro_rules! id_type {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<u64> for $name {
                fn from(value: u64) -> Self {
                    Self(value)
                }
            }
        )+
    };
}

id_type!(
    /// Project identifier
    ProjectId,
    /// Mentor identifier
    MentorId,
    /// Mentoring session identifier
    SessionId,
    /// Conversation identifier
    ConversationId,
    /// Notification identifier
    NotificationId,
);

/// Logical platform operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    // Auth
    Login,
    Register,
    Logout,
    RefreshToken,
    CurrentUser,

    // Projects
    ListProjects,
    CreateProject,
    GetProject(ProjectId),
    UpdateProject(ProjectId),
    DeleteProject(ProjectId),
    ProjectMembers(ProjectId),
    ProjectMilestones(ProjectId),

    // Mentors
    ListMentors,
    GetMentor(MentorId),
    MentorAvailability(MentorId),

    // Sessions
    ListSessions,
    BookSession,
    GetSession(SessionId),
    CancelSession(SessionId),
    SessionFeedback(SessionId),

    // Messages
    ListConversations,
    ConversationMessages(ConversationId),
    SendMessage(ConversationId),

    // Notifications
    ListNotifications,
    MarkNotificationRead(NotificationId),
    MarkAllNotificationsRead,

    Health,
}

impl Endpoint {
    /// HTTP method of the operation
    pub fn method(&self) -> HttpMethod {
        use Endpoint::*;
        match self {
            Login | Register | Logout | RefreshToken | CreateProject | BookSession
            | SessionFeedback(_) | SendMessage(_) | MarkAllNotificationsRead => HttpMethod::Post,
            UpdateProject(_) => HttpMethod::Put,
            CancelSession(_) | MarkNotificationRead(_) => HttpMethod::Patch,
            DeleteProject(_) => HttpMethod::Delete,
            CurrentUser | ListProjects | GetProject(_) | ProjectMembers(_)
            | ProjectMilestones(_) | ListMentors | GetMentor(_) | MentorAvailability(_)
            | ListSessions | GetSession(_) | ListConversations | ConversationMessages(_)
            | ListNotifications | Health => HttpMethod::Get,
        }
    }

    /// Path relative to the client's base URL
    pub fn path(&self) -> String {
        use Endpoint::*;
        match self {
            Login => "/auth/login".to_string(),
            Register => "/auth/register".to_string(),
            Logout => "/auth/logout".to_string(),
            RefreshToken => "/auth/refresh".to_string(),
            CurrentUser => "/auth/me".to_string(),

            ListProjects | CreateProject => "/projects".to_string(),
            GetProject(id) | UpdateProject(id) | DeleteProject(id) => format!("/projects/{id}"),
            ProjectMembers(id) => format!("/projects/{id}/members"),
            ProjectMilestones(id) => format!("/projects/{id}/milestones"),

            ListMentors => "/mentors".to_string(),
            GetMentor(id) => format!("/mentors/{id}"),
            MentorAvailability(id) => format!("/mentors/{id}/availability"),

            ListSessions | BookSession => "/sessions".to_string(),
            GetSession(id) => format!("/sessions/{id}"),
            CancelSession(id) => format!("/sessions/{id}/cancel"),
            SessionFeedback(id) => format!("/sessions/{id}/feedback"),

            ListConversations => "/messages/conversations".to_string(),
            ConversationMessages(id) | SendMessage(id) => {
                format!("/messages/conversations/{id}/messages")
            }

            ListNotifications => "/notifications".to_string(),
            MarkNotificationRead(id) => format!("/notifications/{id}/read"),
            MarkAllNotificationsRead => "/notifications/read-all".to_string(),

            Health => crate::constants::HEALTH_ENDPOINT.to_string(),
        }
    }

    /// Whether responses of this operation are cacheable
    pub fn is_cacheable(&self) -> bool {
        self.method() == HttpMethod::Get && !matches!(self, Endpoint::Health)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_render_typed_ids() {
        assert_eq!(Endpoint::GetProject(ProjectId(42)).path(), "/projects/42");
        assert_eq!(Endpoint::MentorAvailability(MentorId(7)).path(), "/mentors/7/availability");
        assert_eq!(
            Endpoint::SendMessage(ConversationId(3)).path(),
            "/messages/conversations/3/messages"
        );
        assert_eq!(Endpoint::RefreshToken.path(), crate::constants::DEFAULT_REFRESH_ENDPOINT);
    }

    #[test]
    fn test_methods() {
        assert_eq!(Endpoint::ListProjects.method(), HttpMethod::Get);
        assert_eq!(Endpoint::CreateProject.method(), HttpMethod::Post);
        assert_eq!(Endpoint::UpdateProject(1.into()).method(), HttpMethod::Put);
        assert_eq!(Endpoint::DeleteProject(1.into()).method(), HttpMethod::Delete);
        assert!(Endpoint::ListMentors.is_cacheable());
        assert!(!Endpoint::BookSession.is_cacheable());
        assert!(!Endpoint::Health.is_cacheable());
    }

    #[test]
    fn test_display() {
        assert_eq!(Endpoint::GetSession(SessionId(9)).to_string(), "GET /sessions/9");
        assert_eq!("patch".parse::<HttpMethod>(), Ok(HttpMethod::Patch));
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&ProjectId(5)).expect("serializable");
        assert_eq!(json, "5");
        let method = serde_json::to_string(&HttpMethod::Delete).expect("serializable");
        assert_eq!(method, "\"DELETE\"");
    }
}
