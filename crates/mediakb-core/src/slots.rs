//! Names shared between the assistant domain and the knowledge-base action.

pub const ACTION_QUERY_KNOWLEDGE_BASE: &str = "action_query_knowledge_base";

pub const SLOT_OBJECT_TYPE: &str = "object_type";
pub const SLOT_ATTRIBUTE: &str = "attribute";
pub const SLOT_MENTION: &str = "mention";
pub const SLOT_LAST_OBJECT: &str = "knowledge_base_last_object";
pub const SLOT_LAST_OBJECT_TYPE: &str = "knowledge_base_last_object_type";
pub const SLOT_LISTED_OBJECTS: &str = "knowledge_base_listed_objects";
pub const SLOT_LIMIT: &str = "limit";

/// Slots the action reads or writes besides the per-attribute ones.
pub const KNOWLEDGE_BASE_SLOTS: [&str; 7] = [
    SLOT_OBJECT_TYPE,
    SLOT_ATTRIBUTE,
    SLOT_MENTION,
    SLOT_LAST_OBJECT,
    SLOT_LAST_OBJECT_TYPE,
    SLOT_LISTED_OBJECTS,
    SLOT_LIMIT,
];

pub const RESPONSE_ASK_REPHRASE: &str = "utter_ask_rephrase";
pub const RESPONSE_KB_UNAVAILABLE: &str = "utter_knowledge_base_unavailable";
