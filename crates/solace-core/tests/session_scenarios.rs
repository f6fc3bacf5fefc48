use std::sync::Arc;

use serde_json::json;
use solace_ai::llm::{MockLlmClient, MockStep};
use solace_ai::memory::InMemoryMemory;
use solace_ai::speech::{
    RecordingSpeaker, RecordingSynthesizer, ScriptedMicrophone, ScriptedTranscriber,
};
use solace_ai::tools::default_registry;
use solace_ai::{ConversationGraph, Recognition, Role, SpeechIo};
use solace_core::{SYSTEM_PROMPT, Session, VoiceCycle, VoiceEvent, VoiceLoop};

struct Harness {
    client: MockLlmClient,
    memory: InMemoryMemory,
    speaker: RecordingSpeaker,
    synthesizer: RecordingSynthesizer,
    transcriber: ScriptedTranscriber,
    microphone: ScriptedMicrophone,
    session: Session,
    _workdir: tempfile::TempDir,
}

fn harness(steps: Vec<MockStep>, heard: Vec<Option<Recognition>>) -> Harness {
    let workdir = tempfile::tempdir().expect("tempdir");
    std::fs::write(workdir.path().join("gratitude.txt"), "sun").expect("write file");

    let client = MockLlmClient::from_steps("mock-model", steps);
    let memory = InMemoryMemory::new();
    let speaker = RecordingSpeaker::new();
    let synthesizer = RecordingSynthesizer::new();

    // A `None` entry is silence; a `Some` entry is a phrase whose
    // recognition result is scripted alongside it.
    let phrases = heard
        .iter()
        .map(|entry| entry.as_ref().map(|_| vec![1_200i16; 1_600]))
        .collect();
    let recognitions = heard.into_iter().flatten().collect();
    let microphone = ScriptedMicrophone::new(phrases);
    let transcriber = ScriptedTranscriber::new(recognitions);

    let graph = ConversationGraph::new(
        Arc::new(client.clone()),
        default_registry(workdir.path(), 5),
        SYSTEM_PROMPT,
    );
    let speech = SpeechIo::new(Arc::new(transcriber.clone()), Arc::new(synthesizer.clone()))
        .with_input(Arc::new(microphone.clone()))
        .with_output(Arc::new(speaker.clone()));
    let session = Session::new(graph, Arc::new(memory.clone()), "user01").with_speech(speech);

    Harness {
        client,
        memory,
        speaker,
        synthesizer,
        transcriber,
        microphone,
        session,
        _workdir: workdir,
    }
}

#[tokio::test]
async fn anxious_message_with_empty_memory() {
    let mut h = harness(
        vec![MockStep::text(
            "That sounds really heavy. What's weighing on you most?",
        )],
        vec![],
    );

    let turn = h.session.process_turn("I feel anxious today").await.unwrap();

    assert_eq!(turn.model_calls, 1);
    assert_eq!(turn.tool_executions, 0);
    assert!(!turn.has_warnings());

    let messages = h.session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(
        messages[0].content,
        "Past context about the user:\n[]\n\nUser: I feel anxious today"
    );
    assert_eq!(messages[1].role, Role::Assistant);
    assert!(!messages[1].has_tool_calls());

    assert_eq!(h.memory.add_calls(), 1);
    let exchange = &h.memory.exchanges().await[0];
    assert_eq!(exchange[0].role, Role::User);
    assert_eq!(exchange[0].content, "I feel anxious today");
    assert_eq!(exchange[1].role, Role::Assistant);
    assert_eq!(exchange[1].content, turn.reply);

    assert_eq!(h.synthesizer.texts().await, vec![turn.reply.clone()]);
    assert_eq!(h.speaker.played(), 1);
}

#[tokio::test]
async fn list_files_goes_through_tool_and_back() {
    let mut h = harness(
        vec![
            MockStep::tool_call("call-ls", "run_command", json!({"cmd": "ls"})),
            MockStep::text("I can see a gratitude file in there."),
        ],
        vec![],
    );

    let turn = h.session.process_turn("what files are here?").await.unwrap();

    assert_eq!(turn.model_calls, 2);
    assert_eq!(turn.tool_executions, 1);
    assert_eq!(h.client.call_count().await, 2);

    let messages = h.session.messages();
    // user, assistant(tool call), tool result, assistant reply
    assert_eq!(messages.len(), 4);
    assert!(messages[1].has_tool_calls());
    assert_eq!(messages[2].role, Role::Tool);
    assert_eq!(messages[2].tool_call_id.as_deref(), Some("call-ls"));
    if cfg!(unix) {
        assert!(messages[2].content.contains("gratitude.txt"));
    }
    assert_eq!(messages[3].content, "I can see a gratitude file in there.");

    // the second model call saw the tool result
    let second = &h.client.requests().await[1];
    assert!(second.messages.iter().any(|m| m.role == Role::Tool));
    assert_eq!(h.memory.add_calls(), 1);
}

#[tokio::test]
async fn history_is_resent_on_every_turn() {
    let mut h = harness(
        vec![MockStep::text("first reply"), MockStep::text("second reply")],
        vec![],
    );

    h.session.respond("first").await.unwrap();
    h.session.respond("second").await.unwrap();

    let requests = h.client.requests().await;
    // system + user + assistant + user
    assert_eq!(requests[1].messages.len(), 4);
    assert_eq!(requests[1].messages[0].role, Role::System);
    assert_eq!(requests[1].messages[2].content, "first reply");
    assert_eq!(h.session.transcript().len(), 4);
}

#[tokio::test]
async fn second_turn_sees_stored_memory() {
    let mut h = harness(
        vec![MockStep::text("noted"), MockStep::text("welcome back")],
        vec![],
    );

    h.session.respond("My sister Maya visits on Sunday").await.unwrap();
    h.session.clear();
    h.session.respond("Maya is coming soon").await.unwrap();

    let user_msg = &h.session.messages()[0];
    assert!(user_msg.content.contains("My sister Maya visits on Sunday"));
}

#[tokio::test]
async fn silence_makes_no_model_or_memory_calls() {
    let mut h = harness(vec![], vec![None]);

    let cycle = h.session.voice_cycle().await.unwrap();

    assert!(matches!(cycle, VoiceCycle::Skipped(Recognition::NoSpeech)));
    assert_eq!(h.client.call_count().await, 0);
    assert_eq!(h.memory.add_calls(), 0);
    assert_eq!(h.memory.search_calls(), 0);
    assert_eq!(h.transcriber.calls(), 0);
}

#[tokio::test]
async fn spoken_turn_is_answered_aloud() {
    let mut h = harness(
        vec![MockStep::text("I'm listening.")],
        vec![Some(Recognition::Text("I had a rough day".to_string()))],
    );

    let cycle = h.session.voice_cycle().await.unwrap();

    match cycle {
        VoiceCycle::Replied { heard, turn } => {
            assert_eq!(heard, "I had a rough day");
            assert_eq!(turn.reply, "I'm listening.");
        }
        other => panic!("expected a reply, got {other:?}"),
    }
    assert_eq!(h.speaker.played(), 1);
    assert_eq!(h.memory.add_calls(), 1);
}

#[tokio::test]
async fn voice_loop_skips_silence_and_answers_speech() {
    let mut h = harness(
        vec![MockStep::text("Tell me more.")],
        vec![
            None,
            Some(Recognition::Unrecognized),
            Some(Recognition::Text("work is stressful".to_string())),
        ],
    );

    let mut heard = Vec::new();
    let mut skipped = 0;
    let summary = VoiceLoop::new()
        .with_max_cycles(3)
        .run(&mut h.session, std::future::pending::<()>(), |event| match event {
            VoiceEvent::Heard(text) => heard.push(text.to_string()),
            VoiceEvent::Skipped(_) => skipped += 1,
            _ => {}
        })
        .await
        .unwrap();

    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.turns, 1);
    assert_eq!(summary.failures, 0);
    assert_eq!(skipped, 2);
    assert_eq!(heard, vec!["work is stressful".to_string()]);
    assert_eq!(h.microphone.captures(), 3);
    assert_eq!(h.client.call_count().await, 1);
    assert_eq!(h.memory.add_calls(), 1);
}

#[tokio::test]
async fn voice_loop_stops_on_shutdown() {
    let mut h = harness(vec![], vec![]);

    let summary = VoiceLoop::new()
        .run(&mut h.session, async {}, |_| {})
        .await
        .unwrap();

    assert_eq!(summary.turns, 0);
    assert_eq!(h.client.call_count().await, 0);
}

#[tokio::test]
async fn model_failure_in_voice_loop_is_reported_and_skipped() {
    let mut h = harness(
        vec![MockStep::error("rate limit"), MockStep::text("back now")],
        vec![
            Some(Recognition::Text("hello?".to_string())),
            Some(Recognition::Text("hello again".to_string())),
        ],
    );

    let mut failures = 0;
    let summary = VoiceLoop::new()
        .with_max_cycles(2)
        .run(&mut h.session, std::future::pending::<()>(), |event| {
            if let VoiceEvent::Failed(_) = event {
                failures += 1;
            }
        })
        .await
        .unwrap();

    assert_eq!(failures, 1);
    assert_eq!(summary.turns, 1);
    // the failed turn left nothing behind
    assert_eq!(h.session.messages().len(), 2);
    assert_eq!(h.memory.add_calls(), 1);
}

#[tokio::test]
async fn failed_memory_write_keeps_the_reply() {
    let mut h = harness(vec![MockStep::text("I hear you.")], vec![]);
    h.memory.fail_add_with("memory store is down").await;

    let turn = h.session.process_turn("nobody listens to me").await.unwrap();

    assert_eq!(turn.reply, "I hear you.");
    assert!(turn.has_warnings());
    assert!(
        turn.persist_error
            .as_deref()
            .is_some_and(|err| err.contains("memory store is down"))
    );
    assert_eq!(h.session.messages().len(), 2);
    let transcript = h.session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].content, "nobody listens to me");
    assert_eq!(transcript[1].content, "I hear you.");
    assert_eq!(h.speaker.played(), 1);
}

#[tokio::test]
async fn shutdown_during_a_turn_lets_it_finish() {
    let mut h = harness(
        vec![MockStep::text("Take your time.")],
        vec![
            Some(Recognition::Text("I can't sleep".to_string())),
            Some(Recognition::Text("never reached".to_string())),
        ],
    );

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut stop_tx = Some(stop_tx);
    let mut replies = Vec::new();
    let summary = VoiceLoop::new()
        .run(
            &mut h.session,
            async {
                let _ = stop_rx.await;
            },
            |event| match event {
                VoiceEvent::Heard(_) => {
                    if let Some(tx) = stop_tx.take() {
                        let _ = tx.send(());
                    }
                }
                VoiceEvent::Replied(turn) => replies.push(turn.reply.clone()),
                _ => {}
            },
        )
        .await
        .unwrap();

    assert_eq!(summary.turns, 1);
    assert_eq!(replies, vec!["Take your time.".to_string()]);
    assert_eq!(h.microphone.captures(), 1);
    assert_eq!(h.memory.add_calls(), 1);
    assert_eq!(h.session.messages().len(), 2);
    assert_eq!(h.speaker.played(), 1);
}
