//! Prompt templates.
//!
//! Every prompt the pipeline sends is rendered here so wording changes stay
//! in one place. Prompts are in Ukrainian to match the corpus language.

use mriynyk_shared::{Discipline, Grade, Topic};

/// Short free-form explanation of a query, used as the embedding probe.
pub fn direct_explanation(query: &str, grade: Grade, discipline: Discipline) -> String {
    format!(
        "Поясни цю тему з предмету {} учню {}-го класу: {}",
        discipline.label(),
        grade.value(),
        query.trim()
    )
}

/// Render `items` as `0) first`, `1) second`, ... one per line.
pub fn numbered_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| format!("{index}) {}", item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask the model to pick the candidate topic that best matches the query.
pub fn topic_selection(query: &str, candidates: &[Topic]) -> String {
    let labels: Vec<&str> = candidates.iter().map(Topic::as_str).collect();
    format!(
        "Учень поставив запитання: \"{}\"\n\n\
         Нижче наведено список тем підручника, кожна з номером:\n\
         {}\n\n\
         Обери одну тему, яка найкраще відповідає запитанню. \
         Відповідай лише номером теми (ціле число від 0 до {}), без жодного іншого тексту.",
        query.trim(),
        numbered_list(&labels),
        candidates.len().saturating_sub(1)
    )
}

/// Ask the model to answer a multiple-choice question using grounded context.
pub fn question_answer(question: &str, choices: &[String], relevant_info: &str) -> String {
    format!(
        "Використай наведений фрагмент підручника, щоб відповісти на запитання.\n\n\
         Фрагмент підручника:\n{}\n\n\
         Запитання: {}\n\n\
         Варіанти відповіді:\n{}\n\n\
         Відповідай лише номером правильного варіанта (ціле число від 0 до {}), без жодного іншого тексту.",
        relevant_info.trim(),
        question.trim(),
        numbered_list(choices),
        choices.len().saturating_sub(1)
    )
}

/// Workbook generation prompt over the assembled chapter text.
pub fn workbook(
    query: &str,
    discipline: Discipline,
    chapter_text: &str,
    student_info: &str,
) -> String {
    let student_section = if student_info.trim().is_empty() {
        "Додаткової інформації про учня немає.".to_string()
    } else {
        format!("Інформація про учня:\n{}", student_info.trim())
    };

    format!(
        "Ти досвідчений учитель предмету {discipline}.\n\n\
         Учень хоче розібратися з темою: \"{query}\".\n\n\
         {student_section}\n\n\
         Спирайся виключно на наведений нижче текст підручника. \
         Не додавай фактів, яких у ньому немає.\n\n\
         Текст підручника:\n\
         ---\n\
         {chapter}\n\
         ---\n\n\
         Склади робочий зошит:\n\
         1. `markdown_text`: зрозуміле пояснення теми у форматі Markdown, \
         з прикладами з тексту підручника, адаптоване до учня.\n\
         2. `quiz_questions`: 5 запитань для самоперевірки, кожне з 4 варіантами відповіді \
         та індексом правильного варіанта (`correct_option_index`, від 0).",
        discipline = discipline.label(),
        query = query.trim(),
        chapter = chapter_text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_explanation_mentions_grade_and_subject() {
        let prompt = direct_explanation(" дроби ", Grade::Eighth, Discipline::Algebra);
        assert!(prompt.contains("Алгебра"));
        assert!(prompt.contains("8-го класу"));
        assert!(prompt.ends_with("дроби"));
    }

    #[test]
    fn numbered_list_is_zero_based() {
        let list = numbered_list(&["Дроби", "Лінійні рівняння"]);
        assert_eq!(list, "0) Дроби\n1) Лінійні рівняння");
    }

    #[test]
    fn topic_selection_enumerates_candidates() {
        let candidates = vec![
            Topic::new("Fractions"),
            Topic::new("Linear equations"),
            Topic::new("Word problems"),
        ];
        let prompt = topic_selection("solve 2x = 4", &candidates);
        assert!(prompt.contains("0) Fractions"));
        assert!(prompt.contains("2) Word problems"));
        assert!(prompt.contains("від 0 до 2"));
    }

    #[test]
    fn workbook_prompt_handles_missing_student_info() {
        let prompt = workbook("дроби", Discipline::Algebra, "текст", "");
        assert!(prompt.contains("Додаткової інформації про учня немає."));
        assert!(prompt.contains("текст"));

        let prompt = workbook("дроби", Discipline::Algebra, "текст", "любить футбол");
        assert!(prompt.contains("любить футбол"));
    }
}
