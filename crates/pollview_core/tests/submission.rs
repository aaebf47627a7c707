use pollview_core::{
    AnswerDefinition, Demographic, PollDefinition, QuestionDefinition, ResponseAnswer,
    ResponseDraft, ValidationError,
};
use pretty_assertions::assert_eq;

fn poll(required: &[&str]) -> PollDefinition {
    let answers = |base: u64| {
        vec![
            AnswerDefinition {
                id: base + 1,
                text: "yes".into(),
                answer_order: 1,
            },
            AnswerDefinition {
                id: base + 2,
                text: "no".into(),
                answer_order: 2,
            },
        ]
    };
    PollDefinition {
        id: 1,
        title: "Office".into(),
        poll_code: "poll1700000000".into(),
        share_link: None,
        poll_status: None,
        chart_type: None,
        allow_view_results: true,
        required_demographics: required.iter().map(|s| s.to_string()).collect(),
        questions: vec![
            QuestionDefinition {
                id: 20,
                text: "Plants?".into(),
                question_order: 2,
                answers: answers(200),
            },
            QuestionDefinition {
                id: 10,
                text: "Coffee?".into(),
                question_order: 1,
                answers: answers(100),
            },
        ],
        total_responses: 0,
    }
}

#[test]
fn complete_draft_builds_request_in_question_order() {
    let poll = poll(&[]);
    let mut draft = ResponseDraft::new();
    draft.select(20, 202);
    draft.select(10, 101);
    draft.select(10, 102);

    let request = draft.validate(&poll).unwrap();
    assert_eq!(request.poll_code, "poll1700000000");
    assert_eq!(
        request.answers,
        vec![
            ResponseAnswer {
                question_id: 10,
                answer_id: 102,
            },
            ResponseAnswer {
                question_id: 20,
                answer_id: 202,
            },
        ]
    );
    assert_eq!(request.respondent_name, None);
    assert_eq!(request.respondent_age, None);

    let body = serde_json::to_value(&request).unwrap();
    assert_eq!(body["respondentName"], serde_json::Value::Null);
    assert_eq!(body["answers"][0]["questionId"], 10);
}

#[test]
fn unanswered_questions_are_reported_in_display_order() {
    let poll = poll(&[]);
    let draft = ResponseDraft::new();
    assert_eq!(
        draft.validate(&poll),
        Err(ValidationError::UnansweredQuestions {
            missing: vec![10, 20],
        })
    );
}

#[test]
fn foreign_answers_are_rejected() {
    let poll = poll(&[]);
    let mut draft = ResponseDraft::new();
    draft.select(10, 201);
    assert_eq!(
        draft.validate(&poll),
        Err(ValidationError::UnknownAnswer {
            question: 10,
            answer: 201,
        })
    );

    let mut draft = ResponseDraft::new();
    draft.select(30, 1);
    assert_eq!(draft.validate(&poll), Err(ValidationError::UnknownQuestion(30)));
}

#[test]
fn required_demographics_must_be_present_and_not_blank() {
    let poll = poll(&["name", "age"]);
    let mut draft = ResponseDraft::new();
    draft.select(10, 101);
    draft.select(20, 201);
    draft.demographics.name = Some("   ".into());

    let err = draft.validate(&poll).unwrap_err();
    assert_eq!(
        err,
        ValidationError::MissingDemographics {
            fields: vec![Demographic::Name, Demographic::Age],
        }
    );
    assert_eq!(err.to_string(), "Please provide your name, age");

    draft.demographics.name = Some(" Ada ".into());
    draft.demographics.age = Some("36".into());
    let request = draft.validate(&poll).unwrap();
    assert_eq!(request.respondent_name.as_deref(), Some("Ada"));
    assert_eq!(request.respondent_age, Some(36));
}

#[test]
fn age_must_be_a_plausible_number() {
    let poll = poll(&[]);
    let mut draft = ResponseDraft::new();
    draft.select(10, 101);
    draft.select(20, 201);

    for bad in ["abc", "0", "-4", "400"] {
        draft.demographics.age = Some(bad.into());
        assert_eq!(
            draft.validate(&poll),
            Err(ValidationError::InvalidAge(bad.into()))
        );
    }
}
