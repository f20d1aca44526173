use serde_json::{json, Value};

use crate::db::operations::{self, NewLesson, ProgressUpdate, StoreError};
use crate::db::Database;
use crate::models::{now_ms, HistoryStatus, LessonMode, DEFAULT_USER_ID};

struct DemoLesson {
    id: &'static str,
    topic: &'static str,
    mode: LessonMode,
    age_ms: i64,
    progress: Option<(i64, i64, HistoryStatus)>,
    chapters: fn() -> Value,
}

const DEMO_LESSONS: &[DemoLesson] = &[
    DemoLesson {
        id: "seed-lesson-quantum",
        topic: "Quantum Entanglement",
        mode: LessonMode::Feynman,
        age_ms: 10_000_000,
        progress: Some((100, 80, HistoryStatus::Completed)),
        chapters: quantum_chapters,
    },
    DemoLesson {
        id: "seed-lesson-react",
        topic: "React useEffect",
        mode: LessonMode::Interview,
        age_ms: 5_000_000,
        progress: Some((50, 0, HistoryStatus::InProgress)),
        chapters: react_chapters,
    },
    DemoLesson {
        id: "seed-lesson-photo",
        topic: "Photosynthesis",
        mode: LessonMode::Feynman,
        age_ms: 2_000_000,
        progress: None,
        chapters: photosynthesis_chapters,
    },
];

/// Saves the demo lessons for the default user through the regular store
/// path. Re-running overwrites them in place.
pub async fn seed_demo_lessons(db: &Database) -> Result<usize, StoreError> {
    let now = now_ms();

    for demo in DEMO_LESSONS {
        let created_at = now - demo.age_ms;
        let chapters = (demo.chapters)();
        let document = json!({
            "id": demo.id,
            "topic": demo.topic,
            "mode": demo.mode,
            "createdAt": created_at,
            "chapters": chapters,
        });
        let content = document.to_string();

        operations::save_lesson(
            db,
            &NewLesson {
                id: demo.id,
                user_id: DEFAULT_USER_ID,
                topic: demo.topic,
                mode: demo.mode,
                content: &content,
                created_at,
            },
        )
        .await?;

        if let Some((progress, score, status)) = demo.progress {
            operations::update_progress(
                db,
                &ProgressUpdate {
                    user_id: DEFAULT_USER_ID,
                    lesson_id: demo.id,
                    progress,
                    score,
                    status,
                },
            )
            .await?;
        }

        tracing::info!(lesson_id = demo.id, topic = demo.topic, "seeded demo lesson");
    }

    Ok(DEMO_LESSONS.len())
}

fn slide(id: &str, title: &str, content: &str) -> Value {
    json!({
        "id": id,
        "node_id": id,
        "visual_type": "SLIDE",
        "title": title,
        "content": content,
        "status": "READY",
        "generator_version": "1.0"
    })
}

fn quantum_chapters() -> Value {
    json!([{
        "id": "chapter-1",
        "title": "Spooky Action",
        "steps": [
            {
                "id": "step-q1",
                "type": "CONCEPT",
                "title": "The Spooky Action",
                "content": slide(
                    "vis-q1",
                    "What is Entanglement?",
                    "Two entangled particles share one quantum state: measuring one fixes what you will see when you measure the other, however far apart they are."
                )
            },
            {
                "id": "step-q2",
                "type": "ANALOGY",
                "title": "The Magic Coins",
                "content": slide(
                    "vis-q2",
                    "Coin Flip Analogy",
                    "Picture two coins that always land opposite ways. Flip one in Paris and the other, in Tokyo, is already settled."
                )
            },
            {
                "id": "step-q3",
                "type": "QUIZ",
                "title": "Check Understanding",
                "content": slide("vis-q3", "Quiz", "Test your knowledge on entanglement."),
                "quizConfig": {
                    "template_id": "T1_DragSort",
                    "data": {
                        "question": "Order the steps of creating an entangled pair:",
                        "options": ["Generate Pair", "Separate Particles", "Measure State"],
                        "correctOrder": ["Generate Pair", "Separate Particles", "Measure State"]
                    }
                }
            }
        ]
    }])
}

fn react_chapters() -> Value {
    json!([{
        "id": "chapter-1",
        "title": "Effects",
        "steps": [
            {
                "id": "step-r1",
                "type": "CONCEPT",
                "title": "The Lifecycle Hook",
                "content": slide(
                    "vis-r1",
                    "useEffect Explained",
                    "`useEffect` runs side effects after render and can return a cleanup function that runs before the next effect or on unmount."
                )
            },
            {
                "id": "step-r2",
                "type": "FLASHCARD",
                "title": "Interview Question",
                "content": slide("vis-r2", "Dependency Array", "What happens if the dependency array is empty?"),
                "flashcard": {
                    "front": "What does an empty dependency array `[]` mean in useEffect?",
                    "back": "The effect runs once after the first render and its cleanup runs on unmount."
                }
            }
        ]
    }])
}

fn photosynthesis_chapters() -> Value {
    json!([{
        "id": "chapter-1",
        "title": "Solar Power Plant",
        "steps": [
            {
                "id": "step-p1",
                "type": "CONCEPT",
                "title": "Solar Power Plant",
                "content": {
                    "id": "vis-p1",
                    "node_id": "vis-p1",
                    "visual_type": "DIAGRAM",
                    "title": "The Process",
                    "content": "graph LR\n  Sun[Sunlight] --> Leaf\n  CO2[Carbon Dioxide] --> Leaf\n  Water --> Leaf\n  Leaf --> Sugar[Glucose]\n  Leaf --> Oxygen",
                    "status": "READY",
                    "generator_version": "1.0"
                }
            },
            {
                "id": "step-p2",
                "type": "QUIZ",
                "title": "Key Input",
                "content": slide("vis-p2", "What drives it?", "Photosynthesis requires energy to proceed."),
                "quizConfig": {
                    "template_id": "T3_FillBlank",
                    "data": {
                        "text_parts": ["The primary energy source for photosynthesis is ", "."],
                        "correct_answers": ["Sunlight"]
                    }
                }
            }
        ]
    }])
}
