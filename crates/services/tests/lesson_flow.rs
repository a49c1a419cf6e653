use codify_core::{LessonId, LessonSession, SessionBook};
use sandbox::Limits;
use services::AppServices;

#[tokio::test]
async fn every_lesson_can_be_completed_and_reset() {
    let services = AppServices::new_sqlite(
        "sqlite:file:memdb_lesson_flow?mode=memory&cache=shared",
        Limits::default(),
    )
    .await
    .expect("services");
    let progress = services.progress();
    assert!(progress.get_all().await.is_empty());

    let mut book = SessionBook::new();
    for lesson in services.catalog().iter() {
        let session = book.entry(&lesson.id());
        session.set_code(lesson.solution());
        if lesson.id_str() == "intro" {
            session.set_simulated_input("Sam");
        }
        let outcome = services.submissions().submit(session).await.expect("submit");
        assert!(outcome.correct, "{}: {}", lesson.id_str(), outcome.output);
    }

    let all = progress.get_all().await;
    assert_eq!(all.completed_count(), services.catalog().len());

    progress.reset_all().await.expect("reset");
    assert!(progress.get_all().await.is_empty());
}

#[tokio::test]
async fn drafts_survive_switching_lessons() {
    let services = AppServices::in_memory();
    let mut book = SessionBook::new();
    let intro = LessonId::new("intro");
    let variables = LessonId::new("variables");

    book.entry(&intro).set_code("print('draft')");
    book.entry(&variables).set_code("print(25)");
    services
        .submissions()
        .run(book.entry(&intro))
        .await
        .expect("run");

    assert_eq!(book.snapshot(&intro).output(), "draft\n");
    assert_eq!(book.snapshot(&variables).code(), "print(25)");
    assert_eq!(book.snapshot(&variables).output(), "");
}

#[tokio::test]
async fn outcome_serializes_for_the_command_line() {
    let services = AppServices::in_memory();
    let mut session = LessonSession::new(LessonId::new("functions"));
    session.set_code("print(50)");
    let outcome = services
        .submissions()
        .submit(&mut session)
        .await
        .expect("submit");
    let json = serde_json::to_value(&outcome).expect("json");
    assert_eq!(json["lesson_id"], "functions");
    assert_eq!(json["correct"], true);
    assert_eq!(json["output"], "50\n");
    assert_eq!(json["faulted"], false);
}
