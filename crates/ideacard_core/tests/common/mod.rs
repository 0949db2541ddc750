#![allow(dead_code)]

use ideacard_core::{Card, Clock, CreateCardRequest, EditCardRequest, TodoItem};
use std::cell::Cell;
use std::rc::Rc;

/// Manually advanced clock shared between a test and the service.
#[derive(Clone)]
pub struct TestClock(Rc<Cell<i64>>);

impl TestClock {
    pub fn at(now_ms: i64) -> Self {
        Self(Rc::new(Cell::new(now_ms)))
    }

    pub fn set(&self, now_ms: i64) {
        self.0.set(now_ms);
    }
}

impl Clock for TestClock {
    fn now_ms(&self) -> i64 {
        self.0.get()
    }
}

pub fn create_request(title: &str) -> CreateCardRequest {
    CreateCardRequest {
        title: title.to_string(),
        content: format!("{title} content"),
        style: None,
    }
}

/// Edit request whose old and new snapshots both equal `card`'s state.
pub fn unchanged_edit(card: &Card) -> EditCardRequest {
    EditCardRequest {
        title: card.title.clone(),
        content: card.content.clone(),
        style: Some(card.style.clone()),
        todos: card.todos.clone(),
        old_title: card.title.clone(),
        old_content: card.content.clone(),
        old_style: Some(card.style.clone()),
        old_todos: card.todos.clone(),
        ..EditCardRequest::default()
    }
}

pub fn todo(id: &str, text: &str, completed: bool) -> TodoItem {
    TodoItem {
        todo_id: id.to_string(),
        text: text.to_string(),
        completed,
        created_at: 1,
        updated_at: 1,
    }
}
