pub mod add;
pub mod delete;
pub mod r#do;
pub mod list;
pub mod r#move;
pub mod recur;
