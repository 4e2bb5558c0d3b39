//! Diesel schema for task and time entry persistence.

diesel::table! {
    /// Task records; `(name, source_id, source_url)` is unique.
    tasks (id) {
        /// Store-assigned task identifier.
        id -> BigInt,
        /// Task name.
        name -> Text,
        /// Priority level tag.
        priority -> Text,
        /// Difficulty level tag.
        difficulty -> Text,
        /// Normalized tags as a JSON array.
        tags -> Text,
        /// Free-text description.
        #[sql_name = "desc"]
        description -> Text,
        /// Whether an importer created the task.
        is_imported -> Bool,
        /// External provenance identifier.
        source_id -> Nullable<Text>,
        /// External provenance URL.
        source_url -> Nullable<Text>,
    }
}

diesel::table! {
    /// Time entries; deleting the owning task cascades here.
    time_entries (id) {
        /// Store-assigned entry identifier.
        id -> BigInt,
        /// Owning task.
        task_id -> BigInt,
        /// Interval start, RFC 3339 UTC.
        start -> Text,
        /// Interval end, RFC 3339 UTC; null while active.
        #[sql_name = "end"]
        end_at -> Nullable<Text>,
    }
}

diesel::joinable!(time_entries -> tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(tasks, time_entries);
