//! Deterministic offline lesson generator, used whenever the remote model
//! is unavailable or fails.

use crate::models::{
    Flashcard, InteractiveTemplateData, LessonChapter, LessonMode, LessonPlan, LessonStep,
    StepType, VisualAsset, VisualStatus, VisualType,
};

pub const MOCK_GENERATOR_VERSION: &str = "mock";

pub fn generate_mock_lesson(query: &str, mode: LessonMode, now_ms: i64) -> LessonPlan {
    let opening = match mode {
        LessonMode::Interview => LessonStep {
            id: "step-1-1".to_string(),
            step_type: StepType::Flashcard,
            title: "Core Question".to_string(),
            content: slide(
                "1-1",
                query,
                format!("# Interview Question\n\nExplain the core concept of **{query}**."),
                Some("education"),
            ),
            quiz_config: None,
            flashcard: Some(Flashcard {
                front: format!("What is {query}?"),
                back: "It is a fundamental concept in...".to_string(),
            }),
        },
        LessonMode::Feynman => LessonStep {
            id: "step-1-1".to_string(),
            step_type: StepType::Concept,
            title: "Introduction".to_string(),
            content: slide(
                "1-1",
                query,
                format!("# What is {query}?\n\nHere is a simple explanation of the concept..."),
                Some("education"),
            ),
            quiz_config: None,
            flashcard: None,
        },
    };

    let analogy = LessonStep {
        id: "step-1-2".to_string(),
        step_type: StepType::Analogy,
        title: "Analogy".to_string(),
        content: slide(
            "1-2",
            "Real World Analogy",
            format!("# Like a Pizza Shop...\n\nImagine {query} is like a pizza shop where..."),
            Some("pizza"),
        ),
        quiz_config: None,
        flashcard: None,
    };

    let mut quiz_asset = slide(
        "2-1",
        "Test Your Knowledge",
        "Sort the following items:".to_string(),
        None,
    );
    quiz_asset.config_json = serde_json::to_value(InteractiveTemplateData::drag_sort(
        &["Step A", "Step B", "Step C"],
        Some("Order logically..."),
    ))
    .ok();

    let quiz = LessonStep {
        id: "step-2-1".to_string(),
        step_type: StepType::Quiz,
        title: "Quick Quiz".to_string(),
        content: quiz_asset,
        quiz_config: Some(InteractiveTemplateData::drag_sort(&["A", "B"], None)),
        flashcard: None,
    };

    LessonPlan {
        id: format!("lesson-{now_ms}"),
        topic: query.to_string(),
        mode,
        chapters: vec![
            LessonChapter {
                id: "chapter-1".to_string(),
                title: "Chapter 1: Core Concepts".to_string(),
                steps: vec![opening, analogy],
            },
            LessonChapter {
                id: "chapter-2".to_string(),
                title: "Chapter 2: Practice".to_string(),
                steps: vec![quiz],
            },
        ],
        steps: Vec::new(),
        created_at: now_ms,
    }
}

fn slide(suffix: &str, title: &str, content: String, image_keyword: Option<&str>) -> VisualAsset {
    VisualAsset {
        id: format!("asset-{suffix}"),
        node_id: format!("node-{suffix}"),
        visual_type: VisualType::Slide,
        title: title.to_string(),
        content,
        image_url: image_keyword.map(|k| format!("https://source.unsplash.com/1600x900/?{k}")),
        config_json: None,
        generator_version: MOCK_GENERATOR_VERSION.to_string(),
        status: VisualStatus::Ready,
    }
}
