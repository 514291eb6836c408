//! util — общие хелперы.

/// Короткое имя типа без путей модулей и без generic-хвоста:
/// `my_crate::notes::Note` -> `Note`, `Vec<u8>` -> `Vec`.
///
/// Аналог typeof(T).Name: используется как entity name по умолчанию при
/// проверке, что запись принадлежит таблице.
pub fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let no_generics = full.split('<').next().unwrap_or(full);
    no_generics.rsplit("::").next().unwrap_or(no_generics)
}
