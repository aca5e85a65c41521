/// 工具函数集合

use rand::seq::SliceRandom;
use uuid::Uuid;

/// 生成唯一 ID
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// 返回随机打乱顺序后的副本
pub fn random_order<T: Clone>(items: &[T]) -> Vec<T> {
    let mut shuffled = items.to_vec();
    shuffled.shuffle(&mut rand::thread_rng());
    shuffled
}

/// 去除重复元素，保留首次出现的顺序
pub fn unique<T: PartialEq + Clone>(items: &[T]) -> Vec<T> {
    let mut result: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !result.contains(item) {
            result.push(item.clone());
        }
    }
    result
}

/// 判断列表中是否存在重复元素
pub fn has_duplicates<T: PartialEq>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(index, item)| items[index + 1..].contains(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id() {
        let id1 = generate_id();
        let id2 = generate_id();
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36); // UUID v4 格式
    }

    #[test]
    fn test_random_order_keeps_elements() {
        let items = vec![1, 2, 3, 4, 5];
        let mut shuffled = random_order(&items);
        assert_eq!(shuffled.len(), items.len());
        shuffled.sort();
        assert_eq!(shuffled, items);
    }

    #[test]
    fn test_unique() {
        assert_eq!(unique(&["a", "b", "a", "c", "b"]), vec!["a", "b", "c"]);
        assert!(unique::<u8>(&[]).is_empty());
    }

    #[test]
    fn test_has_duplicates() {
        assert!(has_duplicates(&["a", "b", "a"]));
        assert!(!has_duplicates(&["a", "b", "c"]));
        assert!(!has_duplicates::<&str>(&[]));
    }
}
