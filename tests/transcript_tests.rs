// Transcript aggregator semantics: ordered fragment concatenation and
// atomic turn clearing.

use campus_voice::TranscriptAggregator;

#[tokio::test]
async fn fragments_concatenate_in_arrival_order() {
    let transcripts = TranscriptAggregator::new();

    transcripts.append_user("I").await;
    transcripts.append_user("'m").await;
    transcripts.append_user(" hungry").await;

    let snapshot = transcripts.snapshot().await;
    assert_eq!(snapshot.user, "I'm hungry");
    assert_eq!(snapshot.assistant, "");
}

#[tokio::test]
async fn user_and_assistant_buffers_are_independent() {
    let transcripts = TranscriptAggregator::new();

    transcripts.append_user("chapati").await;
    transcripts.append_assistant("Try ").await;
    transcripts.append_user(" please").await;
    transcripts.append_assistant("the market stalls.").await;

    let snapshot = transcripts.snapshot().await;
    assert_eq!(snapshot.user, "chapati please");
    assert_eq!(snapshot.assistant, "Try the market stalls.");
}

#[tokio::test]
async fn turn_completion_clears_both_buffers() {
    let transcripts = TranscriptAggregator::new();

    transcripts.append_user("I'm hungry").await;
    transcripts.append_assistant("Let's find something").await;
    transcripts.clear().await;

    let snapshot = transcripts.snapshot().await;
    assert_eq!(snapshot.user, "");
    assert_eq!(snapshot.assistant, "");
}

#[tokio::test]
async fn accumulation_resumes_after_a_turn() {
    let transcripts = TranscriptAggregator::new();

    transcripts.append_user("first turn").await;
    transcripts.clear().await;
    transcripts.append_user("second").await;
    transcripts.append_assistant(" reply").await;

    let snapshot = transcripts.snapshot().await;
    assert_eq!(snapshot.user, "second");
    assert_eq!(snapshot.assistant, " reply");
}
