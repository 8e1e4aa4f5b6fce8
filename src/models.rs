//! Domain types (spec §3). Store exposes these, never raw rows.

use serde::{Deserialize, Serialize};

// --- Dealership / tenant ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Dealership {
    pub id: i64,
    pub slug: String,
    pub subdomain: String,
    pub display_name: String,
    pub is_active: bool,
    pub scrape_webhook_secret: String,
    pub crm_webhook_secret: String,
    pub posting_cap_per_day: i64,
    pub created_at: String,
}

/// Minimal descriptor returned by `GET /tenancy/resolve`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DealershipDescriptor {
    pub id: i64,
    pub slug: String,
    pub display_name: String,
}

// --- Role & capability (spec §4.2) ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Salesperson,
    Manager,
    Admin,
    Master,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Salesperson => "salesperson",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::Master => "master",
            Role::SuperAdmin => "super_admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "salesperson" => Some(Role::Salesperson),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            "master" => Some(Role::Master),
            "super_admin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    /// `self` admits `required` when `self >= required` in the role ordering,
    /// and `super_admin` always admits (spec §4.2).
    pub fn admits(&self, required: Role) -> bool {
        *self == Role::SuperAdmin || *self >= required
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ImportVehicles,
    ReadVehicles,
    UpdateVehicles,
    DeleteVehicles,
    AutomationTrigger,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ImportVehicles => "import:vehicles",
            Capability::ReadVehicles => "read:vehicles",
            Capability::UpdateVehicles => "update:vehicles",
            Capability::DeleteVehicles => "delete:vehicles",
            Capability::AutomationTrigger => "automation:trigger",
        }
    }

    pub fn parse(s: &str) -> Option<Capability> {
        match s {
            "import:vehicles" => Some(Capability::ImportVehicles),
            "read:vehicles" => Some(Capability::ReadVehicles),
            "update:vehicles" => Some(Capability::UpdateVehicles),
            "delete:vehicles" => Some(Capability::DeleteVehicles),
            "automation:trigger" => Some(Capability::AutomationTrigger),
            _ => None,
        }
    }
}

// --- User ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub dealership_id: Option<i64>,
    pub is_active: bool,
    pub created_at: String,
}

// --- External API token ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExternalApiToken {
    pub id: i64,
    pub dealership_id: i64,
    pub token_name: String,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub token_prefix: String,
    pub permissions: Vec<Capability>,
    pub expires_at: Option<String>,
    pub is_active: bool,
    pub last_used_at: Option<String>,
    pub created_at: String,
}

impl ExternalApiToken {
    pub fn has_all(&self, required: &[Capability]) -> bool {
        required.iter().all(|c| self.permissions.contains(c))
    }
}

// --- Vehicle ---

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Vehicle {
    pub id: i64,
    pub dealership_id: i64,
    pub year: i32,
    pub make: String,
    pub model: String,
    pub trim: Option<String>,
    #[serde(rename = "type")]
    pub vehicle_type: Option<String>,
    pub price: i64,
    pub odometer: i64,
    pub vin: Option<String>,
    pub stock_number: Option<String>,
    pub images: Vec<String>,
    pub local_images: Vec<String>,
    pub carfax_url: Option<String>,
    pub dealer_vdp_url: Option<String>,
    pub last_scraped_at: Option<String>,
    pub marketplace_posted_at: Option<String>,
    pub social_templates: Option<serde_json::Value>,
    pub manual_headline: Option<String>,
    pub manual_subheadline: Option<String>,
    pub manual_description: Option<String>,
    pub is_manually_edited: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Vehicle {
    /// External consumers see `local_images` in place of `images` when present (spec §3).
    pub fn effective_images(&self) -> &[String] {
        if self.local_images.is_empty() {
            &self.images
        } else {
            &self.local_images
        }
    }
}

// --- Conversation / Message ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    WebsiteChat,
    Messenger,
    Sms,
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::WebsiteChat => "website_chat",
            Channel::Messenger => "messenger",
            Channel::Sms => "sms",
            Channel::Email => "email",
        }
    }

    pub fn parse(s: &str) -> Option<Channel> {
        match s {
            "website_chat" => Some(Channel::WebsiteChat),
            "messenger" => Some(Channel::Messenger),
            "sms" => Some(Channel::Sms),
            "email" => Some(Channel::Email),
            _ => None,
        }
    }

    /// §4.3: `type` may be numeric (1=email, 2=sms, 3=call→sms-equivalent) or string.
    pub fn from_numeric(n: i64) -> Option<Channel> {
        match n {
            1 => Some(Channel::Email),
            2 => Some(Channel::Sms),
            3 => Some(Channel::Sms),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Conversation {
    pub id: i64,
    pub dealership_id: i64,
    pub channel: Channel,
    pub participant_id: String,
    pub page_access_token: Option<String>,
    pub assigned_to_user_id: Option<i64>,
    pub ai_enabled: bool,
    pub ai_watch_mode: bool,
    pub lead_status: String,
    pub pipeline_stage: String,
    pub tags: Vec<String>,
    pub handoff_name: Option<String>,
    pub handoff_phone: Option<String>,
    pub handoff_email: Option<String>,
    pub ghl_contact_id: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }

    pub fn parse(s: &str) -> Option<Direction> {
        match s {
            "inbound" => Some(Direction::Inbound),
            "outbound" => Some(Direction::Outbound),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    Provider,
    Crm,
    Lotview,
}

impl SyncSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncSource::Provider => "provider",
            SyncSource::Crm => "crm",
            SyncSource::Lotview => "lotview",
        }
    }

    pub fn parse(s: &str) -> Option<SyncSource> {
        match s {
            "provider" => Some(SyncSource::Provider),
            "crm" => Some(SyncSource::Crm),
            "lotview" => Some(SyncSource::Lotview),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub id: i64,
    pub dealership_id: i64,
    pub conversation_id: i64,
    pub external_message_id: Option<String>,
    pub ghl_message_id: Option<String>,
    pub direction: Direction,
    pub sender_name: Option<String>,
    pub content: String,
    pub is_read: bool,
    pub sent_at: String,
    pub sync_source: SyncSource,
}

// --- Posting automation ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostingStatus {
    Queued,
    Posting,
    Posted,
    Failed,
    Cancelled,
    Interrupted,
}

impl PostingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostingStatus::Queued => "queued",
            PostingStatus::Posting => "posting",
            PostingStatus::Posted => "posted",
            PostingStatus::Failed => "failed",
            PostingStatus::Cancelled => "cancelled",
            PostingStatus::Interrupted => "interrupted",
        }
    }

    pub fn parse(s: &str) -> Option<PostingStatus> {
        match s {
            "queued" => Some(PostingStatus::Queued),
            "posting" => Some(PostingStatus::Posting),
            "posted" => Some(PostingStatus::Posted),
            "failed" => Some(PostingStatus::Failed),
            "cancelled" => Some(PostingStatus::Cancelled),
            "interrupted" => Some(PostingStatus::Interrupted),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PostingQueueItem {
    pub id: i64,
    pub dealership_id: i64,
    pub user_id: i64,
    pub vehicle_id: i64,
    pub account_id: String,
    pub template_id: Option<String>,
    pub status: PostingStatus,
    pub priority: i64,
    pub attempt_count: i64,
    pub last_error: Option<String>,
    pub scheduled_for: Option<String>,
    pub posted_at: Option<String>,
    pub external_listing_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PostingToken {
    pub token: String,
    pub dealership_id: i64,
    pub user_id: i64,
    pub vehicle_id: i64,
    pub platform: String,
    pub expires_at: String,
    pub used_at: Option<String>,
    pub created_at: String,
}

// --- Inventory pipeline ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggeredBy {
    Schedule,
    Manual,
    Webhook,
}

impl TriggeredBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggeredBy::Schedule => "schedule",
            TriggeredBy::Manual => "manual",
            TriggeredBy::Webhook => "webhook",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScrapeRun {
    pub id: i64,
    pub dealership_id: i64,
    pub triggered_by: String,
    pub method: Option<String>,
    pub retry_count: i64,
    pub vehicles_found: i64,
    pub vehicles_inserted: i64,
    pub vehicles_updated: i64,
    pub vehicles_deleted: i64,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub error: Option<String>,
}

// --- Audit & impersonation ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditLog {
    pub id: i64,
    pub dealership_id: Option<i64>,
    pub user_id: i64,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImpersonationSession {
    pub id: i64,
    pub super_admin_id: i64,
    pub target_user_id: i64,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub actions_performed: i64,
}

// --- Notification (C6, spec §4.6) ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewLead,
    ChatMessage,
    PostStatus,
    InventorySync,
    System,
    NewMessage,
    ConversationUpdate,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub timestamp: String,
}
