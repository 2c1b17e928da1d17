//! User-facing texts and callback tokens.

pub const PREV_TOKEN: &str = "<";
pub const NEXT_TOKEN: &str = ">";

pub const PREV_LABEL: &str = "Назад";
pub const NEXT_LABEL: &str = "Далее";

pub const WELCOME: &str =
    "Привет! Я бот для поиска картинок. Введите текстовый запрос, чтобы начать поиск.";
pub const IN_PROGRESS: &str = "Запрос в процессе выполнения. Пожалуйста, подождите...";
pub const NOTHING_FOUND: &str =
    "По вашему запросу ничего не найдено. Пожалуйста, попробуйте еще раз.";
pub const SEARCH_FAILED: &str =
    "Произошла ошибка при выполнении запроса. Пожалуйста, попробуйте еще раз позже.";
pub const CHOOSE_ACTION: &str = "Выберите действие:";
pub const SESSION_EXPIRED: &str = "Поиск устарел. Отправьте новый запрос.";
