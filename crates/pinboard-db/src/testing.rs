//! Row fixtures for store tests.

use chrono::Utc;
use pinboard_types::models::{
    Board, ItemState, Post, TaskStatus, Thing, ThingDetail, ThingKind, Visibility,
};
use uuid::Uuid;

pub fn sample_board(owner: Uuid) -> Board {
    let now = Utc::now();
    Board {
        id: Uuid::new_v4(),
        owner,
        title: "Sample".into(),
        description: "a board".into(),
        visibility: Visibility::Public,
        state: ItemState::Active,
        password: None,
        parent_id: None,
        admins: vec![],
        authors: vec![],
        viewers: vec![],
        subscribers: vec![],
        guests: vec![],
        blocked: vec![],
        followers: vec![],
        tags: vec!["sample".into()],
        likes: vec![],
        comments: vec![],
        created_at: now,
        modified_at: now,
    }
}

pub fn sample_post(board_id: Uuid, owner: Uuid) -> Post {
    let now = Utc::now();
    Post {
        id: Uuid::new_v4(),
        board_id,
        owner,
        title: "Post".into(),
        tags: vec!["post-tag".into()],
        state: ItemState::Active,
        likes: vec![],
        comments: vec![],
        created_at: now,
        modified_at: now,
    }
}

pub fn sample_thing(board_id: Uuid, post_id: Uuid, owner: Uuid, kind: ThingKind) -> Thing {
    let detail = match kind {
        ThingKind::Task => ThingDetail::Task {
            status: TaskStatus::InProgress,
            due_date: Some(Utc::now()),
        },
        ThingKind::File => ThingDetail::File {
            file_ext: ".png".into(),
            file_mime: "image/png".into(),
            file_size: 2048,
        },
        ThingKind::Collection => ThingDetail::Collection { file_count: 2 },
        _ => ThingDetail::Note {
            body: "remember".into(),
        },
    };
    let now = Utc::now();
    Thing {
        id: Uuid::new_v4(),
        board_id,
        post_id,
        owner,
        title: "Thing".into(),
        tags: vec![],
        state: ItemState::Active,
        pos: None,
        likes: vec![],
        comments: vec![],
        created_at: now,
        modified_at: now,
        detail,
    }
}
