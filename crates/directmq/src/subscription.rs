/// 订阅列表
///
/// 以随机唯一 ID 保存主题模式及其处理器

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Error, Result};
use crate::topic::{deduplicate_overlapping_topics, is_subtopic_pattern, match_topic_pattern};
use crate::utils::unique;

/// 生成唯一 ID 的最大尝试次数
pub const MAX_SUBSCRIPTION_ID_ATTEMPTS: usize = 1000;

/// 订阅 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub i32);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 单个订阅
#[derive(Debug, Clone)]
pub struct Subscription<H> {
    pub id: SubscriptionId,
    pub topic: String,
    pub handler: H,
}

/// 订阅列表
#[derive(Debug, Clone)]
pub struct SubscriptionList<H> {
    subscriptions: Vec<Subscription<H>>,
}

impl<H> Default for SubscriptionList<H> {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }
}

impl<H> SubscriptionList<H> {
    pub fn new() -> Self {
        Self::default()
    }

    fn generate_id(&self) -> Result<SubscriptionId> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_SUBSCRIPTION_ID_ATTEMPTS {
            let id = SubscriptionId(rng.gen_range(0..i32::MAX));
            if !self.contains(id) {
                return Ok(id);
            }
        }
        Err(Error::SubscriptionIdExhausted(MAX_SUBSCRIPTION_ID_ATTEMPTS))
    }

    /// 添加订阅，返回新的订阅 ID
    pub fn add(&mut self, topic: impl Into<String>, handler: H) -> Result<SubscriptionId> {
        let id = self.generate_id()?;
        self.subscriptions.push(Subscription {
            id,
            topic: topic.into(),
            handler,
        });
        Ok(id)
    }

    /// 移除订阅，返回是否存在
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|subscription| subscription.id != id);
        before != self.subscriptions.len()
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.subscriptions.iter().any(|subscription| subscription.id == id)
    }

    pub fn get(&self, id: SubscriptionId) -> Option<&Subscription<H>> {
        self.subscriptions.iter().find(|subscription| subscription.id == id)
    }

    /// 按精确主题查找第一个订阅
    pub fn find_by_topic(&self, topic: &str) -> Option<&Subscription<H>> {
        self.subscriptions.iter().find(|subscription| subscription.topic == topic)
    }

    /// 匹配主题的订阅（按添加顺序）
    pub fn triggered(&self, topic: &str) -> Vec<&Subscription<H>> {
        self.subscriptions
            .iter()
            .filter(|subscription| match_topic_pattern(&subscription.topic, topic))
            .collect()
    }

    pub fn will_handle_topic(&self, topic: &str) -> bool {
        self.subscriptions
            .iter()
            .any(|subscription| match_topic_pattern(&subscription.topic, topic))
    }

    /// 是否已有订阅覆盖该模式
    pub fn already_handles_pattern(&self, pattern: &str) -> bool {
        self.subscriptions
            .iter()
            .any(|subscription| is_subtopic_pattern(&subscription.topic, pattern))
    }

    pub fn subscriptions(&self) -> &[Subscription<H>] {
        &self.subscriptions
    }

    pub fn unique_topics(&self) -> Vec<String> {
        let topics: Vec<String> = self
            .subscriptions
            .iter()
            .map(|subscription| subscription.topic.clone())
            .collect();
        unique(&topics)
    }

    /// 去除重叠后的顶层主题
    pub fn top_level_topics(&self) -> Vec<String> {
        deduplicate_overlapping_topics(&self.unique_topics())
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}
